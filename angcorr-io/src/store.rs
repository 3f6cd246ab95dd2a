//! Named-spectrum histogram store.
//!
//! Spectra are addressed by `namespace/name` and serialized as a
//! single JSON document. The store is the exchange format between
//! pipeline stages: prompt and time-random inputs, corrected spectra,
//! and the combined matrices all live in their own namespaces.

use crate::error::{Error, Result};

use angcorr_core::{Spectrum1D, Spectrum2D};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A collection of named 1D and 2D spectra.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramStore {
    spectra_1d: BTreeMap<String, Spectrum1D>,
    spectra_2d: BTreeMap<String, Spectrum2D>,
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

impl HistogramStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a JSON file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Writes the store to a JSON file, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Inserts a 1D spectrum, replacing any previous entry.
    pub fn insert_1d(&mut self, namespace: &str, name: &str, spectrum: Spectrum1D) {
        self.spectra_1d.insert(key(namespace, name), spectrum);
    }

    /// Inserts a 2D spectrum, replacing any previous entry.
    pub fn insert_2d(&mut self, namespace: &str, name: &str, spectrum: Spectrum2D) {
        self.spectra_2d.insert(key(namespace, name), spectrum);
    }

    /// Looks up a 1D spectrum.
    pub fn get_1d(&self, namespace: &str, name: &str) -> Result<&Spectrum1D> {
        self.spectra_1d
            .get(&key(namespace, name))
            .ok_or_else(|| Error::MissingSpectrum {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Looks up a 2D spectrum.
    pub fn get_2d(&self, namespace: &str, name: &str) -> Result<&Spectrum2D> {
        self.spectra_2d
            .get(&key(namespace, name))
            .ok_or_else(|| Error::MissingSpectrum {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Returns true if a 2D spectrum exists under this name.
    pub fn contains_2d(&self, namespace: &str, name: &str) -> bool {
        self.spectra_2d.contains_key(&key(namespace, name))
    }

    /// Total number of stored spectra.
    pub fn len(&self) -> usize {
        self.spectra_1d.len() + self.spectra_2d.len()
    }

    /// Returns true if the store holds no spectra.
    pub fn is_empty(&self) -> bool {
        self.spectra_1d.is_empty() && self.spectra_2d.is_empty()
    }

    /// Iterates all stored keys (`namespace/name`), 1D then 2D.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.spectra_1d
            .keys()
            .chain(self.spectra_2d.keys())
            .map(String::as_str)
    }
}
