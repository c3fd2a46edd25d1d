//! Greeting, STARTTLS and XOAUTH2 authentication.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::{FramedStream, is_continuation, is_tagged_for};
use crate::connection::stream::ImapStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::sasl::{XOAUTH2, decode_challenge, xoauth2_response};
use crate::types::ResponseCode;
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the greeting from a connected stream.
    ///
    /// Capabilities come from the greeting's `[CAPABILITY ...]` code when
    /// present, otherwise from an explicit CAPABILITY command.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => return Err(Error::Bye(text)),
            _ => return Err(Error::Protocol("unexpected greeting".to_string())),
        };

        let mut client = Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            in_flight: false,
            state: NotAuthenticated,
        };
        if client.capabilities.is_empty() {
            client.capability().await?;
        }
        Ok(client)
    }

    /// Authenticates with SASL XOAUTH2.
    ///
    /// The initial response goes inline when the server has SASL-IR and
    /// after the first continuation otherwise. A rejected token makes the
    /// server send an error challenge; it is answered with an empty line and
    /// the resulting tagged NO becomes [`Error::Auth`].
    pub async fn authenticate_xoauth2(
        mut self,
        user: &str,
        token: &str,
    ) -> Result<Client<S, Authenticated>> {
        if !self.supports_auth(XOAUTH2) {
            return Err(Error::MissingCapability(format!("AUTH={XOAUTH2}")));
        }

        let blob = xoauth2_response(user, token);
        let inline = self.supports_sasl_ir();
        let command = Command::Authenticate {
            mechanism: XOAUTH2.to_string(),
            initial_response: inline.then(|| blob.clone()),
        };
        let tag = self.send(&command).await?;

        let mut blob_sent = inline;
        let mut responses = Vec::new();
        loop {
            let response = self.stream.read_response().await?;

            if is_continuation(&response) {
                if blob_sent {
                    if let Ok(Response::Continuation { text: Some(text) }) =
                        ResponseParser::parse(&response)
                    {
                        debug!(challenge = ?decode_challenge(&text), "XOAUTH2 error challenge");
                    }
                    self.stream.write_raw(b"\r\n").await?;
                } else {
                    self.stream.write_raw(format!("{blob}\r\n").as_bytes()).await?;
                    blob_sent = true;
                }
                continue;
            }

            let done = is_tagged_for(&tag, &response);
            responses.push(response);
            if done {
                break;
            }
        }
        self.in_flight = false;

        match Self::check_tagged_ok(&responses, &tag) {
            Ok(()) => {}
            Err(Error::No(text) | Error::Bad(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        }

        self.absorb_capabilities(&responses);
        info!("authenticated with {XOAUTH2}");
        Ok(self.transition(Authenticated))
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades a plaintext connection with STARTTLS.
    ///
    /// Capabilities learned before the upgrade are discarded and fetched
    /// again over TLS.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        if self.stream.get_ref().is_tls() {
            return Err(Error::InvalidState("connection is already TLS".to_string()));
        }

        self.execute(&Command::StartTls).await?;
        let tls = self.stream.into_inner().upgrade_to_tls(host).await?;
        debug!("STARTTLS handshake complete");

        let mut client = Self {
            stream: FramedStream::new(tls),
            tag_gen: self.tag_gen,
            capabilities: Vec::new(),
            in_flight: false,
            state: NotAuthenticated,
        };
        client.capability().await?;
        Ok(client)
    }
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
    use crate::types::Capability;
    use tokio_test::io::Builder;

    fn auth_line(tag: &str, inline: bool) -> Vec<u8> {
        let blob = xoauth2_response("user@example.com", "tok");
        if inline {
            format!("{tag} AUTHENTICATE XOAUTH2 {blob}\r\n").into_bytes()
        } else {
            format!("{tag} AUTHENTICATE XOAUTH2\r\n").into_bytes()
        }
    }

    #[tokio::test]
    async fn test_greeting_with_capabilities() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();

        assert!(client.supports_sasl_ir());
        assert!(client.supports_auth("xoauth2"));
        assert!(!client.is_in_flight());
    }

    #[tokio::test]
    async fn test_greeting_without_capabilities_asks() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 CAPABILITY\r\n")
            .read(b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=XOAUTH2\r\n")
            .read(b"A0000 OK done\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();

        assert!(client.supports_starttls());
        assert!(client.has_capability(&Capability::Imap4Rev1));
    }

    #[tokio::test]
    async fn test_greeting_bye() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_xoauth2_inline() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n")
            .write(&auth_line("A0000", true))
            .read(b"A0000 OK [CAPABILITY IMAP4rev1 SORT UNSELECT] authenticated\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let client = client
            .authenticate_xoauth2("user@example.com", "tok")
            .await
            .unwrap();

        assert!(client.supports_sort());
        assert!(client.supports_unselect());
    }

    #[tokio::test]
    async fn test_xoauth2_after_continuation() {
        let blob = xoauth2_response("user@example.com", "tok");
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=XOAUTH2] ready\r\n")
            .write(&auth_line("A0000", false))
            .read(b"+ \r\n")
            .write(format!("{blob}\r\n").as_bytes())
            .read(b"A0000 OK authenticated\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        assert!(
            client
                .authenticate_xoauth2("user@example.com", "tok")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_xoauth2_rejected_token() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] ready\r\n")
            .write(&auth_line("A0000", true))
            .read(b"+ eyJzdGF0dXMiOiI0MDEifQ==\r\n")
            .write(b"\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let err = client
            .authenticate_xoauth2("user@example.com", "tok")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Auth(text) if text == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_xoauth2_not_offered() {
        let mock = Builder::new()
            .read(b"* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n")
            .build();
        let client = Client::from_stream(mock).await.unwrap();
        let err = client
            .authenticate_xoauth2("user@example.com", "tok")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingCapability(_)));
    }
}
