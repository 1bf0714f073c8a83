//! Mechanism-parameter resolver (§4.3) and the mechanism/mechanism-group
//! data model (§3).
//!
//! Inheritance is implemented as a three-pass resolve rather than a class
//! hierarchy (§9 "Inheritance chains replaced by layered maps"): catalog
//! defaults come from [`parse_density_doc`], per-type and per-instance
//! overrides are folded in with [`apply_overrides`], and the concrete,
//! alias-substituted parameter set for a placement is produced by
//! [`materialize`] only at the point something needs it.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{Result, SonataError};

/// Coarse region tag used to bucket density mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    /// Cell body.
    Soma,
    /// Dendrite.
    Dend,
    /// Axon.
    Axon,
    /// No specific section (applies uniformly, or unresolved).
    None,
}

impl SectionKind {
    /// Parse the `section` field of a mechanism placement.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "soma" => Ok(Self::Soma),
            "dend" => Ok(Self::Dend),
            "axon" => Ok(Self::Axon),
            "none" => Ok(Self::None),
            other => Err(SonataError::schema(format!(
                "unknown section kind '{other}' (expected soma|dend|axon|none)"
            ))),
        }
    }
}

/// `(name, params)` — equality is by name and full parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct MechInstance {
    /// Mechanism name (e.g. `"pas"`, `"expsyn"`).
    pub name: String,
    /// Resolved parameter values.
    pub params: BTreeMap<String, f64>,
}

impl MechInstance {
    /// Build a bare mechanism instance with no parameters set.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Set a parameter, returning `self` for chained construction.
    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// One mechanism placement inside a [`MechGroup`]: which section it paints,
/// its base parameters, and which parameters are aliased to group-level
/// free variables.
#[derive(Debug, Clone, PartialEq)]
pub struct MechPlacement {
    /// Section this placement paints.
    pub section: SectionKind,
    /// `mechanism parameter -> group free variable` redirections.
    pub aliases: BTreeMap<String, String>,
    /// Base (un-aliased) mechanism instance.
    pub base: MechInstance,
}

/// A named group: free variables plus the placements that may reference
/// them via alias.
#[derive(Debug, Clone, PartialEq)]
pub struct MechGroup {
    /// Group name (the top-level key in the parameter document).
    pub name: String,
    /// Free variables, overridable per type or per instance.
    pub variables: BTreeMap<String, f64>,
    /// Mechanism placements belonging to this group.
    pub placements: Vec<MechPlacement>,
}

impl MechGroup {
    /// Materialize every placement's concrete parameter set: `base ∪
    /// {alias.k -> variables[alias.v] for k,v in aliases}`.
    pub fn materialize(&self) -> Vec<(SectionKind, MechInstance)> {
        self.placements
            .iter()
            .map(|placement| {
                let mut params = placement.base.params.clone();
                for (param, var) in &placement.aliases {
                    if let Some(value) = self.variables.get(var) {
                        params.insert(param.clone(), *value);
                    }
                }
                (
                    placement.section,
                    MechInstance {
                        name: placement.base.name.clone(),
                        params,
                    },
                )
            })
            .collect()
    }
}

/// A whole density-mechanism parameter document: `group -> MechGroup`.
pub type DensityDoc = BTreeMap<String, MechGroup>;

/// A whole override document: `group -> {variable -> value}`.
pub type OverrideDoc = BTreeMap<String, BTreeMap<String, f64>>;

/// Load and parse a JSON file.
pub fn load_json_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| SonataError::file_open(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| SonataError::schema(format!("{}: invalid JSON: {e}", path.display())))
}

/// Parse a point-mechanism document: exactly one top-level key, whose
/// value is a flat `param -> number` map.
pub fn parse_point_mechanism(doc: &Value) -> Result<MechInstance> {
    let obj = doc
        .as_object()
        .ok_or_else(|| SonataError::schema("point mechanism document must be a JSON object"))?;
    if obj.len() != 1 {
        return Err(SonataError::schema(format!(
            "point mechanism document must contain exactly one mechanism, found {}",
            obj.len()
        )));
    }
    let (name, params_json) = obj.iter().next().unwrap();
    let params_obj = params_json
        .as_object()
        .ok_or_else(|| SonataError::schema(format!("mechanism '{name}' body must be an object")))?;

    let mut params = BTreeMap::new();
    for (key, value) in params_obj {
        let num = value
            .as_f64()
            .ok_or_else(|| SonataError::schema(format!("parameter '{key}' for mechanism '{name}' is not numeric")))?;
        params.insert(key.clone(), num);
    }

    Ok(MechInstance {
        name: name.clone(),
        params,
    })
}

/// Parse a density-mechanism parameter document: `group -> [entries]`,
/// each entry either a scalar free-variable assignment or a structured
/// mechanism placement.
pub fn parse_density_doc(doc: &Value) -> Result<DensityDoc> {
    let obj = doc
        .as_object()
        .ok_or_else(|| SonataError::schema("density mechanism document must be a JSON object"))?;

    let mut groups = DensityDoc::new();
    for (group_name, entries_json) in obj {
        let entries = entries_json
            .as_array()
            .ok_or_else(|| SonataError::schema(format!("group '{group_name}' body must be a list")))?;

        let mut variables = BTreeMap::new();
        let mut placements = Vec::new();

        for entry in entries {
            let entry_obj = entry
                .as_object()
                .ok_or_else(|| SonataError::schema(format!("group '{group_name}' entry must be an object")))?;

            if entry_obj.contains_key("mech") {
                let section = entry_obj
                    .get("section")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SonataError::schema(format!("group '{group_name}' placement missing 'section'")))?;
                let section = SectionKind::parse(section)?;
                let mech_name = entry_obj
                    .get("mech")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SonataError::schema(format!("group '{group_name}' placement missing 'mech'")))?
                    .to_string();

                let mut base_params = BTreeMap::new();
                let mut aliases = BTreeMap::new();
                for (key, value) in entry_obj {
                    if key == "section" || key == "mech" {
                        continue;
                    }
                    if let Some(s) = value.as_str() {
                        aliases.insert(key.clone(), s.to_string());
                    } else if let Some(n) = value.as_f64() {
                        base_params.insert(key.clone(), n);
                    } else {
                        return Err(SonataError::schema(format!(
                            "group '{group_name}' placement field '{key}' must be numeric or a variable name"
                        )));
                    }
                }

                placements.push(MechPlacement {
                    section,
                    aliases,
                    base: MechInstance {
                        name: mech_name,
                        params: base_params,
                    },
                });
            } else {
                for (key, value) in entry_obj {
                    let num = value
                        .as_f64()
                        .ok_or_else(|| SonataError::schema(format!("free variable '{key}' in group '{group_name}' is not numeric")))?;
                    variables.insert(key.clone(), num);
                }
            }
        }

        groups.insert(
            group_name.clone(),
            MechGroup {
                name: group_name.clone(),
                variables,
                placements,
            },
        );
    }

    Ok(groups)
}

/// Parse an override document: a flat `group -> {variable -> value}` map.
pub fn parse_override_doc(doc: &Value) -> Result<OverrideDoc> {
    let obj = doc
        .as_object()
        .ok_or_else(|| SonataError::schema("override document must be a JSON object"))?;

    let mut out = OverrideDoc::new();
    for (group_name, vars_json) in obj {
        let vars_obj = vars_json
            .as_object()
            .ok_or_else(|| SonataError::schema(format!("override body for group '{group_name}' must be an object")))?;
        let mut vars = BTreeMap::new();
        for (key, value) in vars_obj {
            let num = value
                .as_f64()
                .ok_or_else(|| SonataError::schema(format!("override '{key}' in group '{group_name}' is not numeric")))?;
            vars.insert(key.clone(), num);
        }
        out.insert(group_name.clone(), vars);
    }
    Ok(out)
}

/// Apply an override document atop a density document's free variables,
/// returning a new, resolved document.
pub fn apply_overrides(doc: &DensityDoc, overrides: &OverrideDoc) -> DensityDoc {
    let mut resolved = doc.clone();
    for (group_name, vars) in overrides {
        if let Some(group) = resolved.get_mut(group_name) {
            for (var, value) in vars {
                group.variables.insert(var.clone(), *value);
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_point_mechanism() {
        let doc = json!({ "expsyn": { "tau": 2.0, "e": 0.0 } });
        let mech = parse_point_mechanism(&doc).unwrap();
        assert_eq!(mech.name, "expsyn");
        assert_eq!(mech.params.get("tau"), Some(&2.0));
    }

    #[test]
    fn rejects_multi_key_point_mechanism() {
        let doc = json!({ "expsyn": {}, "exp2syn": {} });
        let err = parse_point_mechanism(&doc).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }

    #[test]
    fn parses_density_doc_and_materializes_with_aliases() {
        let doc = json!({
            "pas_0": [
                { "e_pas": -70.0 },
                { "section": "dend", "mech": "pas", "g": 0.001, "e": "e_pas" }
            ]
        });
        let parsed = parse_density_doc(&doc).unwrap();
        let group = parsed.get("pas_0").unwrap();
        assert_eq!(group.variables.get("e_pas"), Some(&-70.0));
        assert_eq!(group.placements.len(), 1);
        assert_eq!(group.placements[0].section, SectionKind::Dend);

        let materialized = group.materialize();
        assert_eq!(materialized.len(), 1);
        let (section, mech) = &materialized[0];
        assert_eq!(*section, SectionKind::Dend);
        assert_eq!(mech.name, "pas");
        assert_eq!(mech.params.get("g"), Some(&0.001));
        assert_eq!(mech.params.get("e"), Some(&-70.0), "alias should resolve to the free variable value");
    }

    #[test]
    fn overrides_replace_free_variables() {
        let doc = json!({
            "pas_0": [
                { "e_pas": -70.0 },
                { "section": "dend", "mech": "pas", "e": "e_pas" }
            ]
        });
        let parsed = parse_density_doc(&doc).unwrap();

        let overrides_json = json!({ "pas_0": { "e_pas": -80.0 } });
        let overrides = parse_override_doc(&overrides_json).unwrap();

        let resolved = apply_overrides(&parsed, &overrides);
        let group = resolved.get("pas_0").unwrap();
        let materialized = group.materialize();
        assert_eq!(materialized[0].1.params.get("e"), Some(&-80.0));
    }

    #[test]
    fn section_kind_rejects_unknown() {
        assert!(SectionKind::parse("glia").is_err());
        assert_eq!(SectionKind::parse("soma").unwrap(), SectionKind::Soma);
    }
}
