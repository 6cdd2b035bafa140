use anyhow::{anyhow, Context, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

/// How the binder treats a loaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A single model attached to its named group.
    Model,
    /// A template cloned into a set of spinning instances.
    Cluster,
    /// The glowing title text, fades in once loaded.
    Overlay,
}

/// One asset declaration from the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    pub path: String,
    pub kind: AssetKind,
}

/// Asset manifest for the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub assets: Vec<AssetEntry>,
}

impl Manifest {
    /// Parses the manifest XML produced alongside the asset files.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid manifest XML")?;
        let mut assets = Vec::new();

        for node in document.descendants().filter(|n| n.has_tag_name("asset")) {
            let name = required_text(&node, "name")?;
            let path = required_text(&node, "path")
                .with_context(|| format!("asset {name} is missing a path"))?;
            let kind = match optional_text(&node, "kind").as_deref() {
                None | Some("model") => AssetKind::Model,
                Some("cluster") => AssetKind::Cluster,
                Some("overlay") => AssetKind::Overlay,
                Some(other) => {
                    return Err(anyhow!("asset {name} has unknown kind {other:?}"));
                }
            };
            assets.push(AssetEntry { name, path, kind });
        }

        Ok(Self { assets })
    }
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}
