// ai
//! 🗺️ Region Catalog: the atlas of places audit logs like to hide.
//!
//! 🎬 *[a globe spins. it stops on a partition. the partition is called "aws".]*
//! *["Where are the logs?" "Everywhere," the globe whispers. "In thirty-odd places."]*
//!
//! 🧠 Knowledge graph:
//! - `RegionCatalog` is a plain value: a list of partitions, each with its region ids.
//!   It is built once by the caller and handed to the supervisor. No global resolver,
//!   no lazy static, no "whatever the SDK felt like today".
//! - Built-in data lives in `catalog/partitions.json`, embedded at compile time.
//! - `CatalogConfig` can swap in a catalog file, or skip partition lookup entirely with an
//!   explicit region list. Tests use [`RegionCatalog::fixed`].
//! - Order is the catalog's order. Nobody promised it would be alphabetical. Nobody promised anything.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TrailError, TrailResult};

/// 📜 The embedded partition catalog. Regions get added every year or so; so does this file.
const BUILTIN_CATALOG: &str = include_str!("catalog/partitions.json");

/// 🔧 Where regions come from. Co-located with the thing it configures, as is tradition.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    /// 🏷️ Partition id to enumerate: `aws`, `aws-cn`, `aws-us-gov`, or whatever your catalog file says.
    #[serde(default = "default_partition")]
    pub partition: String,
    /// 📂 Optional catalog file replacing the built-in one. Same JSON shape.
    #[serde(default)]
    pub file: Option<String>,
    /// 🎯 Explicit region list. When set, the partition lookup never happens.
    #[serde(default)]
    pub regions: Option<Vec<String>>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            partition: default_partition(),
            file: None,
            regions: None,
        }
    }
}

fn default_partition() -> String {
    // -- 🏢 the public commercial partition. the big one. the one with the gift shop.
    "aws".to_string()
}

/// 🌍 One partition: an id and the regions that live in it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub regions: Vec<String>,
}

/// 🗺️ The region catalog. A value, not a vibe.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RegionCatalog {
    partitions: Vec<Partition>,
}

impl RegionCatalog {
    /// 📦 The catalog that ships inside the binary.
    pub fn builtin() -> TrailResult<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// 🔬 Parse a catalog from its JSON form.
    pub fn from_json(raw: &str) -> TrailResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| TrailError::Config(format!("region catalog is not valid JSON: {e}")))
    }

    /// 📂 Read a catalog file from disk.
    pub async fn from_file(path: &Path) -> TrailResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            TrailError::Config(format!(
                "could not read region catalog '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }

    /// 🧪 A one-partition catalog with exactly these regions, in exactly this order.
    pub fn fixed(partition_id: impl Into<String>, regions: Vec<String>) -> Self {
        let id = partition_id.into();
        Self {
            partitions: vec![Partition {
                name: id.clone(),
                id,
                regions,
            }],
        }
    }

    /// 🔧 Build the catalog the config asks for: explicit regions beat a catalog file,
    /// a catalog file beats the built-in one.
    pub async fn from_config(config: &CatalogConfig) -> TrailResult<Self> {
        if let Some(regions) = &config.regions {
            if regions.is_empty() {
                return Err(TrailError::Config(
                    "catalog.regions was given but is empty".to_string(),
                ));
            }
            debug!("🎯 using {} explicitly configured regions", regions.len());
            return Ok(Self::fixed(config.partition.clone(), regions.clone()));
        }
        match &config.file {
            Some(file) => Self::from_file(Path::new(file)).await,
            None => Self::builtin(),
        }
    }

    /// 🌍 The region ids of `partition_id`, in catalog order, duplicates dropped.
    ///
    /// 💀 Fails only when no partition carries that id.
    pub fn list_regions(&self, partition_id: &str) -> TrailResult<Vec<String>> {
        let partition = self
            .partitions
            .iter()
            .find(|p| p.id == partition_id)
            .ok_or_else(|| TrailError::Catalog {
                partition: partition_id.to_string(),
                detail: format!(
                    "known partitions are [{}]",
                    self.partition_ids().collect::<Vec<_>>().join(", ")
                ),
            })?;

        let mut seen = std::collections::HashSet::new();
        Ok(partition
            .regions
            .iter()
            .filter(|region| seen.insert(region.as_str()))
            .cloned()
            .collect())
    }

    pub fn partition_ids(&self) -> impl Iterator<Item = &str> {
        self.partitions.iter().map(|p| p.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_builtin_atlas_knows_the_commercial_partition() {
        let the_atlas = RegionCatalog::builtin().expect("💀 embedded catalog should parse");
        let the_regions = the_atlas.list_regions("aws").expect("💀 aws partition exists");

        assert!(the_regions.iter().any(|r| r == "us-east-1"));
        assert!(the_regions.iter().any(|r| r == "ap-northeast-1"));
        assert!(!the_regions.iter().any(|r| r.starts_with("cn-")));
    }

    #[test]
    fn the_one_where_an_unknown_partition_is_a_catalog_error() {
        let the_atlas = RegionCatalog::builtin().expect("💀 embedded catalog should parse");
        let the_verdict = the_atlas.list_regions("aws-on-the-moon");

        match the_verdict {
            Err(TrailError::Catalog { partition, .. }) => assert_eq!(partition, "aws-on-the-moon"),
            honestly_who_knows => panic!("💀 expected CatalogError, got {honestly_who_knows:?}"),
        }
    }

    #[test]
    fn the_one_where_fixed_catalogs_keep_their_order_and_drop_twins() {
        let the_atlas = RegionCatalog::fixed(
            "aws",
            vec![
                "eu-west-1".to_string(),
                "us-east-1".to_string(),
                "eu-west-1".to_string(),
            ],
        );
        assert_eq!(
            the_atlas.list_regions("aws").expect("💀 fixed partition exists"),
            vec!["eu-west-1".to_string(), "us-east-1".to_string()]
        );
    }

    #[tokio::test]
    async fn the_one_where_explicit_regions_skip_the_lookup() {
        let the_config = CatalogConfig {
            partition: "aws".to_string(),
            file: Some("/definitely/not/here.json".to_string()),
            regions: Some(vec!["sa-east-1".to_string()]),
        };
        let the_atlas = RegionCatalog::from_config(&the_config)
            .await
            .expect("💀 explicit regions should not touch the file");
        assert_eq!(
            the_atlas.list_regions("aws").expect("💀 partition exists"),
            vec!["sa-east-1".to_string()]
        );
    }

    #[tokio::test]
    async fn the_one_where_an_empty_region_list_is_rejected() {
        let the_config = CatalogConfig {
            regions: Some(Vec::new()),
            ..CatalogConfig::default()
        };
        assert!(matches!(
            RegionCatalog::from_config(&the_config).await,
            Err(TrailError::Config(_))
        ));
    }

    #[tokio::test]
    async fn the_one_where_a_catalog_file_replaces_the_builtin() {
        let the_dir = tempfile::tempdir().expect("💀 tempdir");
        let the_path = the_dir.path().join("partitions.json");
        std::fs::write(
            &the_path,
            r#"{"partitions":[{"id":"lab","regions":["lab-north-1","lab-south-1"]}]}"#,
        )
        .expect("💀 write catalog");

        let the_config = CatalogConfig {
            partition: "lab".to_string(),
            file: Some(the_path.display().to_string()),
            regions: None,
        };
        let the_atlas = RegionCatalog::from_config(&the_config)
            .await
            .expect("💀 catalog file should load");

        assert_eq!(
            the_atlas.list_regions("lab").expect("💀 lab partition"),
            vec!["lab-north-1".to_string(), "lab-south-1".to_string()]
        );
        assert!(the_atlas.list_regions("aws").is_err());
    }
}
