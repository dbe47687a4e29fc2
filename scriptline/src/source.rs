//! Script sources and the fragments compiled out of them.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

use crate::{error::SourceError, span::Range};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`ScriptSource`]. Clones of a source share its id; two
/// sources built separately never do, even with identical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a script comes from: inline text, a location, or both.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    id: SourceId,
    location: Option<Url>,
    text: Option<Arc<str>>,
}

impl ScriptSource {
    pub fn from_text(text: impl Into<Arc<str>>) -> Self {
        Self {
            id: SourceId::next(),
            location: None,
            text: Some(text.into()),
        }
    }

    pub fn from_location(location: Url) -> Self {
        Self {
            id: SourceId::next(),
            location: Some(location),
            text: None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let absolute = std::path::absolute(path)
            .map_err(|_| SourceError::InvalidPath(path.to_path_buf()))?;
        let location = Url::from_file_path(&absolute)
            .map_err(|()| SourceError::InvalidPath(absolute.clone()))?;
        Ok(Self::from_location(location))
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn inline_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Short display name: the last path segment of the location, or
    /// `"script"`.
    pub fn name(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|url| url.path_segments())
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("script")
    }

    /// The script text; inline text wins, otherwise it is read from a
    /// `file:` location.
    pub fn text(&self) -> Result<Cow<'_, str>, SourceError> {
        if let Some(text) = &self.text {
            return Ok(Cow::Borrowed(text));
        }
        let Some(location) = &self.location else {
            return Err(SourceError::NoText);
        };
        if location.scheme() != "file" {
            return Err(SourceError::UnsupportedLocation(location.clone()));
        }
        let path = location
            .to_file_path()
            .map_err(|()| SourceError::UnsupportedLocation(location.clone()))?;
        log::trace!("reading script text from {}", path.display());
        std::fs::read_to_string(&path)
            .map(Cow::Owned)
            .map_err(|source| SourceError::Io {
                location: location.clone(),
                source,
            })
    }
}

/// A (possibly named) sub-range of a source that takes part in
/// compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedFragment {
    pub name: Option<String>,
    pub range: Range,
}

impl NamedFragment {
    pub fn new(name: Option<String>, range: Range) -> Self {
        Self { name, range }
    }
}

/// A source plus the fragments of it that make up the script. No
/// fragments (absent or empty) means the whole file.
#[derive(Debug, Clone)]
pub struct ScriptSourceFragments {
    pub source: ScriptSource,
    pub fragments: Option<Vec<NamedFragment>>,
}

impl ScriptSourceFragments {
    pub fn whole(source: ScriptSource) -> Self {
        Self {
            source,
            fragments: None,
        }
    }

    pub fn new(source: ScriptSource, fragments: Vec<NamedFragment>) -> Self {
        Self {
            source,
            fragments: Some(fragments),
        }
    }

    pub fn is_whole_file(&self) -> bool {
        self.fragments.as_ref().is_none_or(Vec::is_empty)
    }

    /// The text handed to the compiler. See [`merge_fragments`].
    pub fn merged_text(&self) -> Result<String, SourceError> {
        let text = self.source.text()?;
        match &self.fragments {
            Some(fragments) if !fragments.is_empty() => {
                merge_fragments(&text, fragments)
            }
            _ => Ok(text.into_owned()),
        }
    }
}

/// Concatenate `fragments` of `text`, blanking the gaps between them.
///
/// Gap bytes become spaces except `\r` and `\n`, so every fragment keeps
/// the line, column and byte offset it had in `text`. Nothing after the
/// last fragment is emitted. Fragments must carry absolute offsets and be
/// sorted and disjoint.
pub fn merge_fragments(
    text: &str,
    fragments: &[NamedFragment],
) -> Result<String, SourceError> {
    let mut merged = String::with_capacity(text.len());
    let mut previous: Option<&NamedFragment> = None;
    let mut cursor = 0;

    for fragment in fragments {
        let (start, end) = fragment
            .range
            .offsets()
            .ok_or(SourceError::MissingOffset(fragment.range))?;
        if let Some(previous) = previous {
            if cursor > start {
                return Err(SourceError::UnsortedFragments {
                    previous: previous.range,
                    current: fragment.range,
                });
            }
        }
        let out_of_bounds = || SourceError::OutOfBounds {
            range: fragment.range,
            len: text.len(),
        };
        let gap = text.get(cursor..start).ok_or_else(out_of_bounds)?;
        let body = text.get(start..end).ok_or_else(out_of_bounds)?;

        for c in gap.chars() {
            match c {
                '\r' | '\n' => merged.push(c),
                _ => merged.extend(std::iter::repeat_n(' ', c.len_utf8())),
            }
        }
        merged.push_str(body);

        cursor = end;
        previous = Some(fragment);
    }

    Ok(merged)
}
