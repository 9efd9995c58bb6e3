use crate::registry::ClientRegistry;

/// Sends `text` to every registered session except `exclude`.
///
/// Fire-and-forget: a recipient whose outbox is closed or full just misses
/// the line, and the rest of the fan-out carries on. Returns how many
/// recipients accepted it.
pub fn broadcast(registry: &ClientRegistry, text: &str, exclude: Option<&str>) -> usize {
    registry
        .snapshot()
        .into_iter()
        .filter(|(nickname, _)| Some(nickname.as_str()) != exclude)
        .filter(|(_, handle)| handle.send(text))
        .count()
}
