//! Cell morphology trees (§3 "morphology", §4.9 "Morphology resolution").
//!
//! Geometry discretization is explicitly out of scope for the network
//! description layer (§1: "a byte-stream → tree converter is assumed");
//! what the core needs from a morphology is only enough structure to
//! classify points by [`crate::mechanism::SectionKind`] and to check the
//! §8 catalog invariant that every non-virtual cell's morphology has a
//! non-empty soma. This module is that minimal converter, reading the de
//! facto standard SWC point format — full geometry (radii, 3-D
//! coordinates, per-segment discretization) is out of scope.

use std::path::Path;

use crate::error::{Result, SonataError};
use crate::mechanism::SectionKind;

/// One point sample in an SWC morphology: a section kind, a parent
/// pointer, and the raw sample id. 3-D coordinates and radius are kept
/// only because SWC requires them on the line; nothing here interprets
/// them geometrically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphSample {
    /// The SWC sample id (1-based, file order).
    pub id: i64,
    /// The classified section kind for this sample.
    pub kind: SectionKind,
    /// Parent sample id, or `-1` for a root sample.
    pub parent: i64,
}

/// A parsed morphology tree: a flat list of samples in file order, since
/// no consumer of this crate needs the parent links compiled into a real
/// tree structure — they only need [`Morphology::has_soma`] and per-sample
/// section kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Morphology {
    samples: Vec<MorphSample>,
}

impl Morphology {
    /// Parse an SWC file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SonataError::file_open(path, e))?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut samples = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 7 {
                return Err(SonataError::schema(format!(
                    "{}: malformed SWC line (expected 7 fields, got {})",
                    path.display(),
                    fields.len()
                )));
            }
            let id: i64 = fields[0]
                .parse()
                .map_err(|_| SonataError::schema(format!("{}: unparseable sample id", path.display())))?;
            let swc_kind: i64 = fields[1]
                .parse()
                .map_err(|_| SonataError::schema(format!("{}: unparseable section type", path.display())))?;
            let parent: i64 = fields[6]
                .parse()
                .map_err(|_| SonataError::schema(format!("{}: unparseable parent id", path.display())))?;

            samples.push(MorphSample {
                id,
                kind: swc_section_kind(swc_kind),
                parent,
            });
        }

        if samples.is_empty() {
            return Err(SonataError::schema(format!("{}: morphology has no samples", path.display())));
        }

        Ok(Self { samples })
    }

    /// All samples, in file order.
    pub fn samples(&self) -> &[MorphSample] {
        &self.samples
    }

    /// Whether the tree contains at least one soma sample — the §8 catalog
    /// invariant for every non-virtual cell.
    pub fn has_soma(&self) -> bool {
        self.samples.iter().any(|s| s.kind == SectionKind::Soma)
    }
}

/// Standard SWC section-type codes: 1 soma, 2 axon, 3 basal dendrite, 4
/// apical dendrite. Anything else (custom codes 5+, or 0 "undefined")
/// classifies as [`SectionKind::None`].
fn swc_section_kind(code: i64) -> SectionKind {
    match code {
        1 => SectionKind::Soma,
        2 => SectionKind::Axon,
        3 | 4 => SectionKind::Dend,
        _ => SectionKind::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SWC: &str = "\
# a minimal ball-and-stick cell
1 1 0.0 0.0 0.0 5.0 -1
2 3 5.0 0.0 0.0 1.0 1
3 3 10.0 0.0 0.0 1.0 2
4 2 -5.0 0.0 0.0 1.0 1
";

    #[test]
    fn parses_samples_and_classifies_sections() {
        let morph = Morphology::parse(SAMPLE_SWC, Path::new("test.swc")).unwrap();
        assert_eq!(morph.samples().len(), 4);
        assert!(morph.has_soma());
        assert_eq!(morph.samples()[1].kind, SectionKind::Dend);
        assert_eq!(morph.samples()[3].kind, SectionKind::Axon);
    }

    #[test]
    fn rejects_morphology_without_soma() {
        let no_soma = "1 3 0.0 0.0 0.0 1.0 -1\n";
        let morph = Morphology::parse(no_soma, Path::new("test.swc")).unwrap();
        assert!(!morph.has_soma());
    }

    #[test]
    fn rejects_malformed_line() {
        let bad = "1 1 0.0 0.0 0.0 -1\n";
        let err = Morphology::parse(bad, Path::new("test.swc")).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }

    #[test]
    fn rejects_empty_file() {
        let err = Morphology::parse("", Path::new("test.swc")).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }
}
