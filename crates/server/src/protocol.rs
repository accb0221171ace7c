//! The TCP line grammar: parsing and validation are adapter concerns —
//! `ramdb-store` only ever sees an already-validated [`Command`].

use ramdb_store::{Command, StoreError};

use crate::error::ProtocolError;

/// Parse one line (without its trailing `\n`) into a [`Command`].
///
/// Tabs are normalized to spaces, leading/trailing whitespace is trimmed,
/// and tokens are split on runs of one-or-more spaces. A recognized verb
/// with the wrong shape or invalid key/value grammar is a
/// [`ProtocolError::Parse`]; an unrecognized verb is
/// [`ProtocolError::UnknownCommand`].
pub fn parse_line(raw: &str) -> Result<Command, ProtocolError> {
    let normalized = raw.replace('\t', " ");
    let trimmed = normalized.trim();
    let mut tokens = trimmed.split(' ').filter(|t| !t.is_empty());

    let verb = tokens.next().ok_or_else(|| ProtocolError::parse(raw))?;
    match verb {
        "GET" => {
            let key = tokens.next().ok_or_else(|| ProtocolError::parse(raw))?;
            no_more_tokens(&mut tokens, raw)?;
            Command::get(key).ok_or_else(|| ProtocolError::parse(raw))
        }
        "SET" => {
            let key = tokens.next().ok_or_else(|| ProtocolError::parse(raw))?;
            let value = tokens.next().ok_or_else(|| ProtocolError::parse(raw))?;
            no_more_tokens(&mut tokens, raw)?;
            Command::set(key, value).ok_or_else(|| ProtocolError::parse(raw))
        }
        "DEL" => {
            let key = tokens.next().ok_or_else(|| ProtocolError::parse(raw))?;
            no_more_tokens(&mut tokens, raw)?;
            Command::del(key).ok_or_else(|| ProtocolError::parse(raw))
        }
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn no_more_tokens<'a>(tokens: &mut impl Iterator<Item = &'a str>, raw: &str) -> Result<(), ProtocolError> {
    match tokens.next() {
        None => Ok(()),
        Some(_) => Err(ProtocolError::parse(raw)),
    }
}

/// Render a successful executor response as a newline-terminated TCP line.
pub fn render_ok(body: &str) -> String {
    format!("{body}\n")
}

/// Render a [`StoreError`] as a newline-terminated TCP line. `GET z` on an
/// empty store renders exactly `key z not found`.
pub fn render_store_error(err: &StoreError) -> String {
    format!("{err}\n")
}

/// Render a [`ProtocolError`] as a newline-terminated TCP line.
pub fn render_protocol_error(err: &ProtocolError) -> String {
    format!("{err}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_set_del() {
        assert_eq!(parse_line("GET a").unwrap(), Command::Get("a".into()));
        assert_eq!(parse_line("SET a 1").unwrap(), Command::Set("a".into(), "1".into()));
        assert_eq!(parse_line("DEL a").unwrap(), Command::Del("a".into()));
    }

    #[test]
    fn trims_whitespace_and_normalizes_tabs() {
        assert_eq!(parse_line("  GET\ta  \n").unwrap(), Command::Get("a".into()));
        assert_eq!(parse_line("SET  a   1").unwrap(), Command::Set("a".into(), "1".into()));
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(matches!(parse_line("GET"), Err(ProtocolError::Parse { .. })));
        assert!(matches!(parse_line("GET a b"), Err(ProtocolError::Parse { .. })));
        assert!(matches!(parse_line("SET a"), Err(ProtocolError::Parse { .. })));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(matches!(parse_line("SET a has space"), Err(ProtocolError::Parse { .. })));
        assert!(matches!(parse_line("SET a! 1"), Err(ProtocolError::Parse { .. })));
    }

    #[test]
    fn unknown_verb_is_unknown_command_not_parse_error() {
        assert!(matches!(parse_line("PING a"), Err(ProtocolError::UnknownCommand(v)) if v == "PING"));
    }

    #[test]
    fn render_matches_expected_wording() {
        assert_eq!(
            render_store_error(&StoreError::KeyNotFound("z".into())),
            "key z not found\n"
        );
        assert_eq!(render_ok("OK"), "OK\n");
    }
}
