//! Opening mailboxes.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Mailbox, MailboxStatus, ResponseCode};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens a mailbox read-write with SELECT.
    pub async fn select(self, mailbox: Mailbox) -> Result<Client<S, Selected>> {
        self.open(mailbox, false).await
    }

    /// Opens a mailbox read-only with EXAMINE.
    pub async fn examine(self, mailbox: Mailbox) -> Result<Client<S, Selected>> {
        self.open(mailbox, true).await
    }

    async fn open(mut self, mailbox: Mailbox, read_only: bool) -> Result<Client<S, Selected>> {
        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.clone(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.clone(),
                condstore: self.has_capability(&crate::types::Capability::CondStore),
            }
        };

        let responses = self.execute(&command).await?;
        let status = parse_mailbox_status(&responses, read_only);
        info!(
            mailbox = %mailbox,
            exists = status.exists,
            read_only = status.read_only,
            "mailbox opened"
        );

        Ok(self.transition(Selected::new(mailbox, status)))
    }
}

/// Builds the mailbox status from SELECT/EXAMINE responses.
pub(super) fn parse_mailbox_status(responses: &[Vec<u8>], read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only,
        ..MailboxStatus::default()
    };

    for bytes in responses {
        let Ok(response) = ResponseParser::parse(bytes) else {
            continue;
        };
        let code = match response {
            Response::Untagged(UntaggedResponse::Exists(n)) => {
                status.exists = n;
                continue;
            }
            Response::Untagged(UntaggedResponse::Recent(n)) => {
                status.recent = n;
                continue;
            }
            Response::Untagged(UntaggedResponse::Flags(flags)) => {
                status.flags = flags.into_iter().collect();
                continue;
            }
            Response::Untagged(UntaggedResponse::Ok { code, .. }) | Response::Tagged { code, .. } => {
                code
            }
            _ => continue,
        };

        match code {
            Some(ResponseCode::UidValidity(v)) => status.uid_validity = Some(v),
            Some(ResponseCode::UidNext(v)) => status.uid_next = Some(v),
            Some(ResponseCode::Unseen(v)) => status.unseen = Some(v),
            Some(ResponseCode::HighestModSeq(v)) => status.highest_mod_seq = Some(v),
            Some(ResponseCode::PermanentFlags(flags)) => {
                status.permanent_flags = flags.into_iter().collect();
            }
            Some(ResponseCode::ReadOnly) => status.read_only = true,
            _ => {}
        }
    }

    status
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::command::TagGenerator;
    use crate::connection::framed::FramedStream;
    use crate::types::Flag;
    use tokio_test::io::Builder;

    fn authenticated<S>(stream: S) -> Client<S, Authenticated>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Client {
            stream: FramedStream::new(stream),
            tag_gen: TagGenerator::default(),
            capabilities: Vec::new(),
            in_flight: false,
            state: Authenticated,
        }
    }

    #[test]
    fn test_parse_mailbox_status() {
        let responses: Vec<Vec<u8>> = vec![
            b"* FLAGS (\\Answered \\Seen \\Deleted)\r\n".to_vec(),
            b"* 172 EXISTS\r\n".to_vec(),
            b"* 1 RECENT\r\n".to_vec(),
            b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n".to_vec(),
            b"* OK [UIDNEXT 4392] Predicted next UID\r\n".to_vec(),
            b"* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n".to_vec(),
            b"A0002 OK [READ-WRITE] SELECT completed\r\n".to_vec(),
        ];
        let status = parse_mailbox_status(&responses, false);

        assert_eq!(status.exists, 172);
        assert_eq!(status.recent, 1);
        assert_eq!(status.uid_validity.unwrap().get(), 3_857_529_045);
        assert_eq!(status.uid_next.unwrap().get(), 4392);
        assert!(status.flags.contains(&Flag::Answered));
        assert!(status.permanent_flags.contains(&Flag::Wildcard));
        assert!(!status.read_only);
    }

    #[test]
    fn test_read_only_from_tagged_code() {
        let responses = vec![b"A0002 OK [READ-ONLY] done\r\n".to_vec()];
        assert!(parse_mailbox_status(&responses, false).read_only);
    }

    #[tokio::test]
    async fn test_examine() {
        let mock = Builder::new()
            .write(b"A0000 EXAMINE Sent\r\n")
            .read(b"* 4 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 7] ok\r\n")
            .read(b"A0000 OK [READ-ONLY] EXAMINE completed\r\n")
            .build();
        let client = authenticated(mock).examine(Mailbox::new("Sent")).await.unwrap();

        assert_eq!(client.state().mailbox().as_str(), "Sent");
        assert_eq!(client.state().exists(), 4);
        assert!(client.state().is_read_only());
    }

    #[tokio::test]
    async fn test_select_missing_mailbox() {
        let mock = Builder::new()
            .write(b"A0000 SELECT Archive\r\n")
            .read(b"A0000 NO [NONEXISTENT] Unknown Mailbox\r\n")
            .build();
        let err = authenticated(mock)
            .select(Mailbox::new("Archive"))
            .await
            .unwrap_err();

        assert!(matches!(err, crate::Error::No(text) if text == "Unknown Mailbox"));
    }
}
