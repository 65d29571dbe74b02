use std::fmt;

use serde::Serialize;

use crate::model::FileRef;

/// A content fault: something about the host's data prevented one piece of
/// work, while unrelated work continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<FileRef>,
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the file the problem was found in, unless one is set already.
    pub fn with_source(mut self, source: &FileRef) -> Self {
        if self.source.is_none() {
            self.source = Some(source.clone());
        }
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", source.presentable_url, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<designwire_frame::FrameError> for Problem {
    fn from(err: designwire_frame::FrameError) -> Self {
        Problem::new(err.to_string())
    }
}

impl From<designwire_registry::RegistryError> for Problem {
    fn from(err: designwire_registry::RegistryError) -> Self {
        Problem::new(err.to_string())
    }
}

impl From<crate::error::ClientError> for Problem {
    fn from(err: crate::error::ClientError) -> Self {
        Problem::new(err.to_string())
    }
}

/// Problems accumulated across a batch, in the order they occurred.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ProblemsHolder {
    problems: Vec<Problem>,
}

impl ProblemsHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.push(Problem::new(message));
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    pub fn clear(&mut self) {
        self.problems.clear();
    }
}

impl<'a> IntoIterator for &'a ProblemsHolder {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
