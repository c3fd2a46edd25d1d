//! Parsed response shapes.

use crate::types::{Capability, Flag, ResponseCode, SeqNum, Uid};

/// Untagged server data (`* ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* PREAUTH` greeting.
    PreAuth {
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// `* FLAGS (...)`
    Flags(Vec<Flag>),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Data items in server order.
        items: Vec<FetchItem>,
    },
    /// `* SEARCH ...`; numbers are UIDs for `UID SEARCH`.
    Search(Vec<u32>),
    /// `* SORT ...`; numbers are UIDs for `UID SORT`, in sorted order.
    Sort(Vec<u32>),
    /// Untagged data this client does not interpret, keyed by its name.
    Other(String),
}

/// One data item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `FLAGS (...)`
    Flags(Vec<Flag>),
    /// `UID n`
    Uid(Uid),
    /// `RFC822.SIZE n`
    Rfc822Size(u32),
    /// `INTERNALDATE "..."`, unparsed.
    InternalDate(String),
    /// `BODYSTRUCTURE (...)`
    BodyStructure(BodyStructure),
    /// `BODY[section]<origin> literal`
    Body {
        /// Section specifier; `None` for the whole message.
        section: Option<String>,
        /// Partial-fetch origin octet.
        origin: Option<u32>,
        /// Payload; `None` when the server sent `NIL`.
        data: Option<Vec<u8>>,
    },
    /// `MODSEQ (n)`
    ModSeq(u64),
}

/// MIME structure as reported by `BODYSTRUCTURE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStructure {
    /// A leaf part.
    Single {
        /// Top-level media type, e.g. `TEXT`.
        media_type: String,
        /// Media subtype, e.g. `PLAIN`.
        subtype: String,
        /// Content-Type parameters.
        params: Vec<(String, String)>,
        /// Content-ID.
        id: Option<String>,
        /// Content-Description.
        description: Option<String>,
        /// Content-Transfer-Encoding.
        encoding: String,
        /// Encoded size in octets.
        size: u32,
    },
    /// A `multipart/*` container.
    Multipart {
        /// Child parts in order.
        parts: Vec<Self>,
        /// Multipart subtype, e.g. `MIXED`.
        subtype: String,
    },
}

impl BodyStructure {
    /// Number of leaf parts.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Multipart { parts, .. } => parts.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Returns true if any leaf is neither text nor a multipart container.
    #[must_use]
    pub fn has_non_text_part(&self) -> bool {
        match self {
            Self::Single { media_type, .. } => !media_type.eq_ignore_ascii_case("TEXT"),
            Self::Multipart { parts, .. } => parts.iter().any(Self::has_non_text_part),
        }
    }
}
