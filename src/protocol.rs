pub const NICKNAME_PROMPT: &str = "enter a nickname";
pub const QUIT_KEYWORD: &str = "/quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyNickname,
    NicknameTaken,
}

impl Rejection {
    /// The line sent to the peer right before its connection is closed.
    pub fn line(self) -> &'static str {
        match self {
            Rejection::EmptyNickname => "nickname cannot be empty; closing connection",
            Rejection::NicknameTaken => "nickname already in use; closing connection",
        }
    }
}

pub fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case(QUIT_KEYWORD)
}

/// Accepts the nickname exactly as received. Surrounding whitespace is kept,
/// so `"alice "` and `"alice"` are different nicknames; only a line with
/// nothing but whitespace is refused.
pub fn parse_nickname(line: &str) -> Result<&str, Rejection> {
    if line.trim().is_empty() {
        return Err(Rejection::EmptyNickname);
    }

    Ok(line)
}

pub fn chat_line(nickname: &str, text: &str) -> String {
    format!("[{}] {}", nickname, text)
}

pub fn joined_line(nickname: &str, connected: usize) -> String {
    format!("{} has joined — now {} connected", nickname, connected)
}

pub fn left_line(nickname: &str, connected: usize) -> String {
    format!("{} has left — now {} connected", nickname, connected)
}
