//! UID STORE command handler.
//!
//! Modifies `\Seen` and `\Deleted` on messages identified by UID:
//!
//! - `+FLAGS (...)` -- add flags
//! - `-FLAGS (...)` -- remove flags
//! - `FLAGS (...)` -- replace flags
//!
//! Unless `.SILENT` is given, responds with
//! `* N FETCH (UID u FLAGS (...))` per modified message.

use crate::fake_imap::io::{bad, write_line};
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use crate::fake_imap::sequence::expand;
use imap_codec::imap_types::flag::{Flag, StoreResponse, StoreType};
use imap_codec::imap_types::sequence::SequenceSet;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Parsed STORE command arguments.
pub struct StoreArgs<'a> {
    pub sequence_set: &'a SequenceSet,
    pub kind: &'a StoreType,
    pub response: &'a StoreResponse,
    pub flags: &'a [Flag<'a>],
}

impl StoreArgs<'_> {
    fn apply(&self, email: &mut TestEmail) {
        let seen = self.flags.iter().any(|f| matches!(f, Flag::Seen));
        let deleted = self.flags.iter().any(|f| matches!(f, Flag::Deleted));
        match self.kind {
            StoreType::Add => {
                email.seen |= seen;
                email.deleted |= deleted;
            }
            StoreType::Remove => {
                email.seen &= !seen;
                email.deleted &= !deleted;
            }
            StoreType::Replace => {
                email.seen = seen;
                email.deleted = deleted;
            }
        }
    }
}

/// Handle the UID STORE command.
pub async fn handle_uid_store<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    args: &StoreArgs<'_>,
    mailbox: &Mutex<Mailbox>,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        return bad(stream, tag, "No folder selected").await;
    };

    // `(seq, uid, flags)` per modified message, collected under lock.
    let results: Option<Vec<(usize, u32, String)>> = {
        let mut mb = mailbox.lock().unwrap();
        mb.get_folder_mut(folder_name).map(|folder| {
            let uids = expand(args.sequence_set, folder.max_uid());
            folder
                .emails
                .iter_mut()
                .enumerate()
                .filter(|(_, e)| uids.binary_search(&e.uid).is_ok())
                .map(|(idx, email)| {
                    args.apply(email);
                    (idx + 1, email.uid, email.flags())
                })
                .collect()
        })
    };
    let Some(results) = results else {
        return bad(stream, tag, "Folder not found").await;
    };

    if !matches!(args.response, StoreResponse::Silent) {
        for (seq, uid, flags) in &results {
            let line = format!("* {seq} FETCH (UID {uid} FLAGS ({flags}))\r\n");
            if write_line(stream, &line).await.is_err() {
                return;
            }
        }
    }

    let resp = format!("{tag} OK STORE completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::{output, pipe};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use crate::fake_imap::sequence::parse;

    async fn run(
        set: &str,
        kind: StoreType,
        response: StoreResponse,
        flags: &[Flag<'_>],
        mailbox: &Mutex<Mailbox>,
    ) -> String {
        let set = parse(set);
        let args = StoreArgs {
            sequence_set: &set,
            kind: &kind,
            response: &response,
            flags,
        };
        let (mut stream, client) = pipe();
        handle_uid_store("A1", &args, mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);
        output(client).await
    }

    fn mailbox() -> Mutex<Mailbox> {
        Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .email(1, "a@one.example", "1")
                .email(2, "b@two.example", "2")
                .email(3, "c@three.example", "3")
                .build(),
        )
    }

    fn flags_of(mailbox: &Mutex<Mailbox>) -> Vec<(bool, bool)> {
        mailbox
            .lock()
            .unwrap()
            .get_folder("INBOX")
            .unwrap()
            .emails
            .iter()
            .map(|e| (e.seen, e.deleted))
            .collect()
    }

    #[tokio::test]
    async fn silent_add_deleted() {
        let mb = mailbox();
        let out = run("2", StoreType::Add, StoreResponse::Silent, &[Flag::Deleted], &mb).await;

        assert_eq!(out, "A1 OK STORE completed\r\n");
        assert_eq!(flags_of(&mb), vec![(false, false), (false, true), (false, false)]);
    }

    #[tokio::test]
    async fn answer_reports_flags() {
        let mb = mailbox();
        let out = run(
            "1:2",
            StoreType::Add,
            StoreResponse::Answer,
            &[Flag::Seen, Flag::Deleted],
            &mb,
        )
        .await;

        assert!(out.contains("* 1 FETCH (UID 1 FLAGS (\\Seen \\Deleted))"));
        assert!(out.contains("* 2 FETCH (UID 2 FLAGS (\\Seen \\Deleted))"));
    }

    #[tokio::test]
    async fn remove_and_replace() {
        let mb = mailbox();
        run("1:*", StoreType::Add, StoreResponse::Silent, &[Flag::Seen, Flag::Deleted], &mb).await;
        run("1", StoreType::Remove, StoreResponse::Silent, &[Flag::Deleted], &mb).await;
        run("3", StoreType::Replace, StoreResponse::Silent, &[], &mb).await;

        assert_eq!(flags_of(&mb), vec![(true, false), (true, true), (false, false)]);
    }
}
