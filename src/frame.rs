use std::borrow::Cow;

/// One decoded barcode, as handed over by the optical decoder on a sampling tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    text: Option<String>,
    bytes: Option<Vec<u8>>,
}

impl Frame {
    pub fn new(text: Option<String>, bytes: Option<Vec<u8>>) -> Self {
        Self { text, bytes }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), bytes: None }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { text: None, bytes: Some(bytes.into()) }
    }

    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn raw_bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Nothing decodable: no bytes and no non-blank text
    pub fn is_empty(&self) -> bool {
        let no_text = self.text.as_deref().is_none_or(|text| text.trim().is_empty());
        let no_bytes = self.bytes.as_deref().is_none_or(<[u8]>::is_empty);

        no_text && no_bytes
    }

    /// Bytes that say something the text doesn't
    pub fn distinct_bytes(&self) -> Option<&[u8]> {
        let bytes = self.bytes.as_deref().filter(|bytes| !bytes.is_empty())?;

        match self.text.as_deref() {
            Some(text) if text.as_bytes() == bytes => None,
            _ => Some(bytes),
        }
    }

    /// The text, or a lossy rendering of the bytes when the decoder produced no text
    pub fn text_or_lossy(&self) -> Cow<'_, str> {
        match (&self.text, &self.bytes) {
            (Some(text), _) => Cow::Borrowed(text),
            (None, Some(bytes)) => String::from_utf8_lossy(bytes),
            (None, None) => Cow::Borrowed(""),
        }
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}
