//! UID SEARCH command handler.
//!
//! Matches emails against parsed `SearchKey` criteria from imap-types.
//! We support:
//!
//! - `All` -- every message in the selected folder
//! - `Seen` / `Unseen` / `Deleted` -- flag-based filtering
//! - `Uid(set)` -- messages whose UID is in the set
//! - `And`, `Or`, `Not` -- logical combinators
//!
//! Results are always UIDs (RFC 3501 Section 7.2.5):
//!
//! ```text
//! * SEARCH 4 9
//! A0003 OK SEARCH completed
//! ```

use crate::fake_imap::io::{bad, write_line};
use crate::fake_imap::mailbox::{Folder, Mailbox, TestEmail};
use crate::fake_imap::sequence::expand;
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the UID SEARCH command.
pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        return bad(stream, tag, "No folder selected").await;
    };
    let Some(folder) = mailbox.get_folder(folder_name) else {
        return bad(stream, tag, "Folder not found").await;
    };

    let mut line = String::from("* SEARCH");
    for email in &folder.emails {
        if criteria.iter().all(|key| matches_key(folder, email, key)) {
            line.push(' ');
            line.push_str(&email.uid.to_string());
        }
    }
    line.push_str("\r\n");

    let _ = write_line(stream, &line).await;
    let resp = format!("{tag} OK SEARCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

/// Check if a test email matches a single `SearchKey`.
fn matches_key(folder: &Folder, email: &TestEmail, key: &SearchKey<'_>) -> bool {
    match key {
        SearchKey::Seen => email.seen,
        SearchKey::Unseen => !email.seen,
        SearchKey::Deleted => email.deleted,
        SearchKey::Uid(set) => expand(set, folder.max_uid())
            .binary_search(&email.uid)
            .is_ok(),
        SearchKey::And(keys) => keys.as_ref().iter().all(|k| matches_key(folder, email, k)),
        SearchKey::Or(a, b) => matches_key(folder, email, a) || matches_key(folder, email, b),
        SearchKey::Not(k) => !matches_key(folder, email, k),
        // `All` and anything unsupported match everything.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::{output, pipe};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use crate::fake_imap::sequence::parse;

    async fn run(criteria: &[SearchKey<'_>], mailbox: &Mailbox, selected: Option<&str>) -> String {
        let (mut stream, client) = pipe();
        handle_uid_search("A1", criteria, mailbox, selected, &mut stream).await;
        drop(stream);
        output(client).await
    }

    fn inbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(1, "a@one.example", "1")
            .email(2, "b@two.example", "2")
            .email(5, "c@three.example", "5")
            .email(6, "d@four.example", "6")
            .build()
    }

    #[tokio::test]
    async fn search_all_returns_all_uids() {
        let out = run(&[SearchKey::All], &inbox(), Some("INBOX")).await;

        assert!(out.contains("* SEARCH 1 2 5 6\r\n"));
        assert!(out.contains("A1 OK SEARCH completed"));
    }

    #[tokio::test]
    async fn search_uid_set() {
        let out = run(&[SearchKey::Uid(parse("2:5"))], &inbox(), Some("INBOX")).await;
        assert!(out.contains("* SEARCH 2 5\r\n"));
    }

    #[tokio::test]
    async fn search_not_uid_excludes_processed() {
        let key = SearchKey::Not(Box::new(SearchKey::Uid(parse("1:2,6"))));
        let out = run(&[key], &inbox(), Some("INBOX")).await;
        assert!(out.contains("* SEARCH 5\r\n"));
    }

    #[tokio::test]
    async fn search_uid_star_matches_highest() {
        let out = run(&[SearchKey::Uid(parse("*"))], &inbox(), Some("INBOX")).await;
        assert!(out.contains("* SEARCH 6\r\n"));
    }

    #[tokio::test]
    async fn empty_result_has_bare_search_line() {
        let key = SearchKey::Not(Box::new(SearchKey::All));
        let out = run(&[key], &inbox(), Some("INBOX")).await;
        assert!(out.starts_with("* SEARCH\r\n"));
    }

    #[tokio::test]
    async fn search_flags() {
        let mut mailbox = inbox();
        mailbox.get_folder_mut("INBOX").unwrap().emails[1].seen = true;

        let seen = run(&[SearchKey::Seen], &mailbox, Some("INBOX")).await;
        let unseen = run(&[SearchKey::Unseen], &mailbox, Some("INBOX")).await;

        assert!(seen.contains("* SEARCH 2\r\n"));
        assert!(unseen.contains("* SEARCH 1 5 6\r\n"));
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let out = run(&[SearchKey::All], &inbox(), None).await;
        assert_eq!(out, "A1 BAD No folder selected\r\n");
    }

    #[tokio::test]
    async fn missing_folder() {
        let out = run(&[SearchKey::All], &inbox(), Some("Nope")).await;
        assert_eq!(out, "A1 BAD Folder not found\r\n");
    }
}
