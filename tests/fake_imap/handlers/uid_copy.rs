//! UID COPY command handler.
//!
//! Copies messages from the selected folder to a destination folder.
//! The copies get fresh UIDs from the destination; the originals stay
//! in the source folder until flagged `\Deleted` and expunged.

use crate::fake_imap::io::{bad, write_line};
use crate::fake_imap::mailbox::Mailbox;
use crate::fake_imap::notice::Notice;
use crate::fake_imap::sequence::expand;
use imap_codec::imap_types::sequence::SequenceSet;
use std::sync::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the UID COPY command. Returns the EXISTS notice for the
/// destination when anything was copied.
pub async fn handle_uid_copy<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    dest_folder: &str,
    mailbox: &Mutex<Mailbox>,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) -> Option<Notice> {
    let Some(folder_name) = selected_folder else {
        bad(stream, tag, "No folder selected").await;
        return None;
    };

    // The lock is released before any write.
    let copied = copy(mailbox, folder_name, sequence_set, dest_folder);

    let notice = match copied {
        Ok(notice) => notice,
        Err(Missing::Source) => {
            bad(stream, tag, "Source folder not found").await;
            return None;
        }
        Err(Missing::Destination) => {
            let resp = format!("{tag} NO [TRYCREATE] Destination folder not found\r\n");
            let _ = write_line(stream, &resp).await;
            return None;
        }
    };

    let resp = format!("{tag} OK COPY completed\r\n");
    let _ = write_line(stream, &resp).await;
    notice
}

enum Missing {
    Source,
    Destination,
}

fn copy(
    mailbox: &Mutex<Mailbox>,
    source: &str,
    sequence_set: &SequenceSet,
    destination: &str,
) -> Result<Option<Notice>, Missing> {
    let mut mb = mailbox.lock().unwrap();
    let source = mb.get_folder(source).ok_or(Missing::Source)?;
    let uids = expand(sequence_set, source.max_uid());
    let emails: Vec<_> = source
        .emails
        .iter()
        .filter(|e| uids.binary_search(&e.uid).is_ok())
        .cloned()
        .collect();

    let dest = mb
        .get_folder_mut(destination)
        .ok_or(Missing::Destination)?;
    if emails.is_empty() {
        return Ok(None);
    }
    for mut email in emails {
        email.deleted = false;
        dest.append(email);
    }
    Ok(Some(Notice::Exists {
        folder: destination.to_string(),
        count: dest.emails.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::{output, pipe};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use crate::fake_imap::sequence::parse;

    async fn run(
        set: &str,
        dest: &str,
        mailbox: &Mutex<Mailbox>,
        selected: Option<&str>,
    ) -> (String, Option<Notice>) {
        let (mut stream, client) = pipe();
        let notice = handle_uid_copy("A1", &parse(set), dest, mailbox, selected, &mut stream).await;
        drop(stream);
        (output(client).await, notice)
    }

    fn mailbox() -> Mutex<Mailbox> {
        Mutex::new(
            MailboxBuilder::new()
                .folder("INBOX")
                .email(3, "promo@spam.example", "Win big")
                .email(4, "friend@ham.example", "Lunch?")
                .folder("INBOX.Filtered")
                .email(10, "old@spam.example", "Old")
                .build(),
        )
    }

    #[tokio::test]
    async fn copies_with_new_uid() {
        let mb = mailbox();
        let (out, notice) = run("3", "INBOX.Filtered", &mb, Some("INBOX")).await;

        assert!(out.contains("A1 OK COPY completed"));
        assert_eq!(
            notice,
            Some(Notice::Exists {
                folder: "INBOX.Filtered".into(),
                count: 2
            })
        );

        let snap = mb.lock().unwrap().clone();
        let dest = snap.get_folder("INBOX.Filtered").unwrap();
        assert_eq!(dest.emails[1].uid, 11);
        assert_eq!(dest.emails[1].subject, "Win big");
        assert_eq!(snap.get_folder("INBOX").unwrap().emails.len(), 2);
    }

    #[tokio::test]
    async fn nothing_to_copy_has_no_notice() {
        let mb = mailbox();
        let (out, notice) = run("99", "INBOX.Filtered", &mb, Some("INBOX")).await;

        assert!(out.contains("A1 OK COPY completed"));
        assert!(notice.is_none());
    }

    #[tokio::test]
    async fn missing_destination_is_trycreate() {
        let mb = mailbox();
        let (out, notice) = run("3", "Nope", &mb, Some("INBOX")).await;

        assert!(out.contains("A1 NO [TRYCREATE]"));
        assert!(notice.is_none());
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let mb = mailbox();
        let (out, _) = run("3", "INBOX.Filtered", &mb, None).await;
        assert_eq!(out, "A1 BAD No folder selected\r\n");
    }
}
