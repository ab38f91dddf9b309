//! FETCH and UID FETCH command handler.
//!
//! Only envelope data is served. Each matching message produces one
//! line:
//!
//! ```text
//! * 3 FETCH (UID 12 FLAGS (\Seen) ENVELOPE (NIL "subject"
//!     ((NIL NIL "promo" "spam.example")) ((NIL NIL "promo" "spam.example"))
//!     NIL NIL NIL NIL NIL NIL))
//! ```
//!
//! The envelope fields are date, subject, from, sender, reply-to, to,
//! cc, bcc, in-reply-to and message-id (RFC 3501 Section 7.4.2). The
//! from and sender lists carry the same address; a message without one
//! gets NIL for both.

use crate::fake_imap::io::{bad, write_line};
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use crate::fake_imap::sequence::expand;
use imap_codec::imap_types::sequence::SequenceSet;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle FETCH (`by_uid == false`) or UID FETCH. The set is matched
/// against sequence numbers or UIDs accordingly.
pub async fn handle_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    by_uid: bool,
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

    let largest = if by_uid {
        folder.max_uid()
    } else {
        u32::try_from(folder.emails.len()).unwrap_or(u32::MAX)
    };
    let wanted = expand(sequence_set, largest);

    for (seq, email) in (1u32..).zip(&folder.emails) {
        let key = if by_uid { email.uid } else { seq };
        if wanted.binary_search(&key).is_err() {
            continue;
        }
        let line = format!(
            "* {seq} FETCH (UID {} FLAGS ({}) ENVELOPE {})\r\n",
            email.uid,
            email.flags(),
            envelope(email)
        );
        if write_line(stream, &line).await.is_err() {
            return;
        }
    }

    let resp = format!("{tag} OK FETCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

fn envelope(email: &TestEmail) -> String {
    let addresses = email.sender.as_ref().map_or_else(
        || "NIL".to_string(),
        |(mailbox, host)| format!("((NIL NIL {} {}))", quote(mailbox), quote(host)),
    );
    format!(
        "(NIL {} {addresses} {addresses} NIL NIL NIL NIL NIL NIL)",
        quote(&email.subject)
    )
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::{output, pipe};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use crate::fake_imap::sequence::parse;

    async fn run(set: &str, by_uid: bool, mailbox: &Mailbox, selected: Option<&str>) -> String {
        let (mut stream, client) = pipe();
        handle_fetch("A1", &parse(set), by_uid, mailbox, selected, &mut stream).await;
        drop(stream);
        output(client).await
    }

    fn inbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(4, "friend@ham.example", "Lunch?")
            .email(7, "promo@spam.example", "Win big")
            .anonymous(9, "Nobody")
            .build()
    }

    #[tokio::test]
    async fn fetches_by_sequence_number() {
        let out = run("2:*", false, &inbox(), Some("INBOX")).await;

        assert!(out.contains("* 2 FETCH (UID 7 "));
        assert!(out.contains("* 3 FETCH (UID 9 "));
        assert!(!out.contains("UID 4 "));
        assert!(out.ends_with("A1 OK FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn fetches_by_uid() {
        let out = run("4,9", true, &inbox(), Some("INBOX")).await;

        assert!(out.contains("* 1 FETCH (UID 4 "));
        assert!(out.contains("* 3 FETCH (UID 9 "));
        assert!(!out.contains("UID 7 "));
    }

    #[tokio::test]
    async fn renders_sender_address_twice() {
        let out = run("7", true, &inbox(), Some("INBOX")).await;

        assert!(out.contains(
            "ENVELOPE (NIL \"Win big\" ((NIL NIL \"promo\" \"spam.example\")) \
             ((NIL NIL \"promo\" \"spam.example\")) NIL NIL NIL NIL NIL NIL)"
        ));
    }

    #[tokio::test]
    async fn anonymous_message_has_nil_addresses() {
        let out = run("9", true, &inbox(), Some("INBOX")).await;

        assert!(out.contains("ENVELOPE (NIL \"Nobody\" NIL NIL NIL"));
    }

    #[tokio::test]
    async fn escapes_subject() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, "a@b.example", "say \"hi\" \\o/")
            .build();
        let out = run("1", true, &mailbox, Some("INBOX")).await;

        assert!(out.contains("\"say \\\"hi\\\" \\\\o/\""));
    }

    #[tokio::test]
    async fn unknown_uids_are_skipped() {
        let out = run("100:200", true, &inbox(), Some("INBOX")).await;
        assert_eq!(out, "A1 OK FETCH completed\r\n");
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let out = run("1", false, &inbox(), None).await;
        assert_eq!(out, "A1 BAD No folder selected\r\n");
    }
}
