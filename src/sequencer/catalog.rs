/// Register catalog - named offsets and procedures supplied as data
use super::procedures;
use super::step::{ConfigStep, Procedure};
use crate::error::{Result, SneError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// Target-specific register map plus the procedures built on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCatalog {
  #[serde(default)]
  pub registers: BTreeMap<String, u32>,
  #[serde(default, rename = "procedure")]
  pub procedures: Vec<Procedure>,
}

impl RegisterCatalog {
  pub fn from_toml_str(content: &str) -> Result<Self> {
    toml::from_str(content).map_err(|e| SneError::config(format!("failed to parse catalog: {}", e)))
  }

  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .map_err(|e| SneError::config(format!("cannot read catalog {:?}: {}", path, e)))?;
    let catalog = Self::from_toml_str(&content)?;
    catalog.validate()?;
    Ok(catalog)
  }

  /// The SNE catalog, including the generated `full-bringup` procedure
  pub fn builtin() -> Result<Self> {
    let mut catalog = Self::from_toml_str(BUILTIN_CATALOG)?;
    let bringup = procedures::full_bringup(&catalog)?;
    catalog.procedures.push(bringup);
    catalog.validate()?;
    Ok(catalog)
  }

  /// Layers `other` on top: registers and procedures with the same name are replaced
  pub fn merge(&mut self, other: RegisterCatalog) {
    self.registers.extend(other.registers);
    for procedure in other.procedures {
      match self.procedures.iter_mut().find(|p| p.name == procedure.name) {
        Some(existing) => *existing = procedure,
        None => self.procedures.push(procedure),
      }
    }
  }

  pub fn register(&self, name: &str) -> Result<u32> {
    self
      .registers
      .get(name)
      .copied()
      .ok_or_else(|| SneError::UnknownRegister { name: name.to_string() })
  }

  pub fn procedure(&self, name: &str) -> Result<&Procedure> {
    self
      .procedures
      .iter()
      .find(|p| p.name == name)
      .ok_or_else(|| SneError::UnknownProcedure { name: name.to_string() })
  }

  pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
    self.procedures.iter().map(|p| p.name.as_str())
  }

  /// Turns an `offset` / `register` pair into an offset; exactly one must be set
  pub fn resolve(&self, offset: Option<u32>, register: Option<&str>) -> Result<u32> {
    match (offset, register) {
      (Some(offset), None) => Ok(offset),
      (None, Some(name)) => self.register(name),
      (Some(_), Some(name)) => Err(SneError::config(format!(
        "step names register {} and also gives a raw offset",
        name
      ))),
      (None, None) => Err(SneError::config("step has neither offset nor register")),
    }
  }

  /// Unique procedure names, every register reference resolvable
  pub fn validate(&self) -> Result<()> {
    let mut seen = HashSet::new();
    for procedure in &self.procedures {
      if !seen.insert(procedure.name.as_str()) {
        return Err(SneError::config(format!("duplicate procedure {}", procedure.name)));
      }
      for step in &procedure.steps {
        if let Some(name) = step.register_name() {
          self.register(name)?;
        }
        if let ConfigStep::StageWords { words, count, .. } = step {
          if words.is_empty() && *count > 0 {
            return Err(SneError::config(format!(
              "procedure {} stages {} words from an empty list",
              procedure.name, count
            )));
          }
        }
      }
    }
    Ok(())
  }
}
