//! The walk corpus handed to the embedding trainer.

use crate::{Error, Result};
use std::fmt::Display;
use std::io::Write;

/// An ordered collection of walks over dense node indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    walks: Vec<Vec<usize>>,
}

impl Corpus {
    pub fn walks(&self) -> &[Vec<usize>] {
        &self.walks
    }

    pub fn into_walks(self) -> Vec<Vec<usize>> {
        self.walks
    }

    pub fn len(&self) -> usize {
        self.walks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<usize>> {
        self.walks.iter()
    }

    /// Total number of node occurrences over all walks.
    pub fn token_count(&self) -> usize {
        self.walks.iter().map(Vec::len).sum()
    }

    /// How many times each node in `0..node_count` occurs in the corpus.
    pub fn occurrences(&self, node_count: usize) -> Vec<usize> {
        let mut counts = vec![0usize; node_count];
        for &v in self.walks.iter().flatten() {
            if let Some(c) = counts.get_mut(v) {
                *c += 1;
            }
        }
        counts
    }

    /// String tokens, one sentence per walk, with node `i` rendered as `labels[i]`.
    pub fn to_sentences<N: Display>(&self, labels: &[N]) -> Result<Vec<Vec<String>>> {
        self.walks
            .iter()
            .map(|walk| {
                walk.iter()
                    .map(|&v| labels.get(v).map(ToString::to_string).ok_or(Error::MissingNode(v)))
                    .collect()
            })
            .collect()
    }

    /// One walk per line, node indices separated by single spaces.
    pub fn write_lines<W: Write>(&self, out: W) -> Result<()> {
        self.write_with(out, |w, v| write!(w, "{v}"))
    }

    /// Like [`Corpus::write_lines`], with node `i` written as `labels[i]`.
    pub fn write_labeled<W: Write, N: Display>(&self, labels: &[N], out: W) -> Result<()> {
        if let Some(&v) = self.walks.iter().flatten().find(|&&v| v >= labels.len()) {
            return Err(Error::MissingNode(v));
        }
        self.write_with(out, |w, v| write!(w, "{}", labels[v]))
    }

    fn write_with<W, F>(&self, mut out: W, mut token: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&mut W, usize) -> std::io::Result<()>,
    {
        for walk in &self.walks {
            for (i, &v) in walk.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                token(&mut out, v)?;
            }
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl From<Vec<Vec<usize>>> for Corpus {
    fn from(walks: Vec<Vec<usize>>) -> Self {
        Self { walks }
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Vec<usize>;
    type IntoIter = std::slice::Iter<'a, Vec<usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.walks.iter()
    }
}
