//! File specs and the file-mapping normalizer
//!
//! A dependency declares its files as an ordered list whose items are either
//! a bare remote path or a map of remote path to output. Outputs under a
//! `{release}/` remote are fetched from the release assets and may be
//! extraction maps. [`normalize`] turns that list plus a concrete version
//! into the [`LockShape`] recorded in the lockfile.
//!
//! Specs sharing a remote path collapse into one lock entry: plain files
//! gain extra destinations and extraction maps are merged member by member.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder replaced by the resolved version (leading `v` stripped).
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Prefix marking a remote path as a release asset rather than a repository file.
pub const RELEASE_PREFIX: &str = "{release}/";

/// One declared file mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSpec {
    /// Repository file saved under its basename.
    Path(String),
    /// Repository file saved under an explicit local path.
    Rename { remote: String, local: String },
    /// Release asset; `remote` keeps its `{release}/` prefix.
    Release { remote: String, output: ReleaseOutput },
}

/// Where a release asset ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutput {
    /// Asset saved as a single file.
    Rename(String),
    /// Asset is an archive; each member is moved to its destination.
    Extract(Vec<(String, String)>),
    /// Asset is an archive; a list of members that keep their own path or
    /// carry a rename map.
    ExtractList(Vec<ExtractItem>),
}

/// One item of an extraction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractItem {
    /// Member placed under its own path.
    Keep(String),
    /// Members placed under the mapped destinations.
    Rename(Vec<(String, String)>),
}

impl ReleaseOutput {
    /// Archive member -> destination pairs in declaration order; empty for
    /// single-file outputs.
    pub fn members(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Rename(_) => Vec::new(),
            Self::Extract(pairs) => pairs.iter().map(|(m, d)| (m.as_str(), d.as_str())).collect(),
            Self::ExtractList(items) => items
                .iter()
                .flat_map(|item| match item {
                    ExtractItem::Keep(member) => vec![(member.as_str(), member.as_str())],
                    ExtractItem::Rename(pairs) => {
                        pairs.iter().map(|(m, d)| (m.as_str(), d.as_str())).collect()
                    }
                })
                .collect(),
        }
    }

    pub fn is_archive(&self) -> bool {
        !matches!(self, Self::Rename(_))
    }
}

impl FileSpec {
    /// The remote path exactly as declared.
    pub fn remote(&self) -> &str {
        match self {
            Self::Path(remote) | Self::Rename { remote, .. } | Self::Release { remote, .. } => {
                remote
            }
        }
    }

    pub fn is_release(&self) -> bool {
        matches!(self, Self::Release { .. })
    }

    /// Parse one item of a declared `files` list into one or more specs.
    pub fn parse_item(item: &Value) -> Result<Vec<Self>, String> {
        match item {
            Value::String(remote) => Ok(vec![Self::from_bare(remote)]),
            Value::Object(map) => map
                .iter()
                .map(|(remote, output)| Self::from_pair(remote, output))
                .collect(),
            other => Err(format!(
                "file entries must be strings or maps, found {other}"
            )),
        }
    }

    /// Parse a whole declared `files` list.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>, String> {
        match value {
            Value::Array(items) => {
                let mut specs = Vec::new();
                for item in items {
                    specs.extend(Self::parse_item(item)?);
                }
                Ok(specs)
            }
            Value::Null => Ok(Vec::new()),
            other => Err(format!("files must be a list, found {other}")),
        }
    }

    fn from_bare(remote: &str) -> Self {
        if remote.starts_with(RELEASE_PREFIX) {
            Self::Release {
                remote: remote.to_string(),
                output: ReleaseOutput::Rename(basename(remote).to_string()),
            }
        } else {
            Self::Path(remote.to_string())
        }
    }

    fn from_pair(remote: &str, output: &Value) -> Result<Self, String> {
        let is_release = remote.starts_with(RELEASE_PREFIX);
        match output {
            Value::String(local) if is_release => Ok(Self::Release {
                remote: remote.to_string(),
                output: ReleaseOutput::Rename(local.clone()),
            }),
            Value::String(local) => Ok(Self::Rename {
                remote: remote.to_string(),
                local: local.clone(),
            }),
            Value::Object(_) | Value::Array(_) if !is_release => Err(format!(
                "\"{remote}\" maps to an extraction target but is not a {RELEASE_PREFIX} asset"
            )),
            Value::Object(members) => Ok(Self::Release {
                remote: remote.to_string(),
                output: ReleaseOutput::Extract(member_pairs(remote, members)?),
            }),
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| match item {
                        Value::String(member) => Ok(ExtractItem::Keep(member.clone())),
                        Value::Object(members) => {
                            Ok(ExtractItem::Rename(member_pairs(remote, members)?))
                        }
                        other => Err(format!(
                            "members of \"{remote}\" must be strings or maps, found {other}"
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Release {
                    remote: remote.to_string(),
                    output: ReleaseOutput::ExtractList(items),
                })
            }
            other => Err(format!(
                "output of \"{remote}\" must be a string, map or list, found {other}"
            )),
        }
    }

    /// Render back to the declaration form used in manifests.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Path(remote) => Value::String(remote.clone()),
            Self::Rename { remote, local } => single(remote, Value::String(local.clone())),
            Self::Release { remote, output } => match output {
                ReleaseOutput::Rename(local) if local == basename(remote) => {
                    Value::String(remote.clone())
                }
                ReleaseOutput::Rename(local) => single(remote, Value::String(local.clone())),
                ReleaseOutput::Extract(pairs) => single(remote, pairs_value(pairs)),
                ReleaseOutput::ExtractList(items) => single(
                    remote,
                    Value::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                ExtractItem::Keep(member) => Value::String(member.clone()),
                                ExtractItem::Rename(pairs) => pairs_value(pairs),
                            })
                            .collect(),
                    ),
                ),
            },
        }
    }

    fn is_archive(&self) -> bool {
        matches!(self, Self::Release { output, .. } if output.is_archive())
    }
}

fn member_pairs(remote: &str, members: &Map<String, Value>) -> Result<Vec<(String, String)>, String> {
    members
        .iter()
        .map(|(member, dest)| match dest {
            Value::String(dest) => Ok((member.clone(), dest.clone())),
            other => Err(format!(
                "destination of \"{member}\" in \"{remote}\" must be a string, found {other}"
            )),
        })
        .collect()
}

fn pairs_value(pairs: &[(String, String)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .map(|(m, d)| (m.clone(), Value::String(d.clone())))
            .collect(),
    )
}

/// Find specs that cannot share one lock entry: a remote declared both as a
/// plain file and as an archive, or an archive member sent to two
/// different destinations.
pub fn remote_conflict(specs: &[FileSpec]) -> Option<String> {
    let mut archives: BTreeMap<&str, bool> = BTreeMap::new();
    let mut members: BTreeMap<(&str, &str), &str> = BTreeMap::new();

    for spec in specs {
        let remote = spec.remote();
        if let Some(previous) = archives.insert(remote, spec.is_archive())
            && previous != spec.is_archive()
        {
            return Some(format!(
                "\"{remote}\" is declared both as a file and as an archive"
            ));
        }
        let FileSpec::Release { output, .. } = spec else {
            continue;
        };
        for (member, dest) in output.members() {
            if let Some(previous) = members.insert((remote, member), dest)
                && previous != dest
            {
                return Some(format!(
                    "archive member \"{member}\" is mapped to two different destinations"
                ));
            }
        }
    }
    None
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Final path component of a `/`-separated remote path.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Replace every `{version}` in `path`, stripping leading `v`s from `version`.
pub fn substitute_version(path: &str, version: &str) -> String {
    path.replace(VERSION_PLACEHOLDER, version.trim_start_matches('v'))
}

/// Asset name for a release-scoped remote path, or `None` for repository files.
pub fn release_asset_name(remote: &str) -> Option<&str> {
    remote.strip_prefix(RELEASE_PREFIX)
}

/// Local side of one lock shape entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockTarget {
    File(String),
    /// One remote file saved under several local paths.
    Files(Vec<String>),
    Archive(BTreeMap<String, String>),
}

impl LockTarget {
    /// Local destinations relative to the dependency folder.
    pub fn destinations(&self) -> Vec<&str> {
        match self {
            Self::File(local) => vec![local.as_str()],
            Self::Files(locals) => locals.iter().map(String::as_str).collect(),
            Self::Archive(members) => members.values().map(String::as_str).collect(),
        }
    }

    /// Fold a later spec for the same remote into this target.
    ///
    /// Archives merge their member maps, later members winning; file targets
    /// collect every distinct destination. A kind mismatch keeps the later
    /// target.
    fn merge(self, incoming: LockTarget) -> LockTarget {
        match (self, incoming) {
            (Self::Archive(mut members), Self::Archive(more)) => {
                members.extend(more);
                Self::Archive(members)
            }
            (Self::Archive(_), incoming) | (_, incoming @ Self::Archive(_)) => incoming,
            (current, incoming) => {
                let mut locals: Vec<String> = current.into_locals();
                for local in incoming.into_locals() {
                    if !locals.contains(&local) {
                        locals.push(local);
                    }
                }
                if locals.len() == 1 {
                    Self::File(locals.remove(0))
                } else {
                    Self::Files(locals)
                }
            }
        }
    }

    fn into_locals(self) -> Vec<String> {
        match self {
            Self::File(local) => vec![local],
            Self::Files(locals) => locals,
            Self::Archive(members) => members.into_values().collect(),
        }
    }
}

/// Version-substituted remote path -> local target.
pub type LockShape = BTreeMap<String, LockTarget>;

/// First archive member or destination that would escape the dependency
/// folder.
pub fn unsafe_path(shape: &LockShape) -> Option<&str> {
    shape.values().find_map(|target| {
        let members: Vec<&str> = match target {
            LockTarget::Archive(members) => members.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        };
        members
            .into_iter()
            .chain(target.destinations())
            .find(|path| !vendor_fs::io::is_contained(path))
    })
}

/// Local destinations of every entry in a lock shape.
pub fn flatten(shape: &LockShape) -> Vec<String> {
    shape
        .values()
        .flat_map(|target| target.destinations())
        .map(str::to_string)
        .collect()
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileShape {
    /// Local destinations in declaration order, without duplicates; an
    /// archive's destinations are sorted by member
    pub flat_names: Vec<String>,
    /// Canonical comparison unit stored in the lockfile
    pub lock_shape: LockShape,
}

/// Normalize declared specs against a concrete version.
///
/// `flat_names` holds exactly the destinations of `lock_shape`.
pub fn normalize(specs: &[FileSpec], version: &str) -> FileShape {
    let mut lock_shape = LockShape::new();
    let mut ordered: Vec<String> = Vec::new();

    for spec in specs {
        let remote = substitute_version(spec.remote(), version);
        let target = match spec {
            FileSpec::Path(_) => LockTarget::File(basename(&remote).to_string()),
            FileSpec::Rename { local, .. } => LockTarget::File(substitute_version(local, version)),
            FileSpec::Release {
                output: ReleaseOutput::Rename(local),
                ..
            } => LockTarget::File(substitute_version(local, version)),
            FileSpec::Release { output, .. } => LockTarget::Archive(
                output
                    .members()
                    .into_iter()
                    .map(|(member, dest)| {
                        (
                            substitute_version(member, version),
                            substitute_version(dest, version),
                        )
                    })
                    .collect(),
            ),
        };

        for dest in target.destinations() {
            if !ordered.iter().any(|n| n == dest) {
                ordered.push(dest.to_string());
            }
        }
        let target = match lock_shape.remove(&remote) {
            Some(existing) => existing.merge(target),
            None => target,
        };
        lock_shape.insert(remote, target);
    }

    // Merging may have dropped an earlier destination.
    let locked: BTreeSet<String> = flatten(&lock_shape).into_iter().collect();
    let flat_names = ordered
        .into_iter()
        .filter(|name| locked.contains(name))
        .collect();

    FileShape {
        flat_names,
        lock_shape,
    }
}

/// serde adapter for `files` lists in declarations.
pub(crate) mod file_list {
    use super::FileSpec;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(files: &[FileSpec], serializer: S) -> Result<S::Ok, S::Error> {
        Value::Array(files.iter().map(FileSpec::to_value).collect()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<FileSpec>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FileSpec::parse_list(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn specs(value: Value) -> Vec<FileSpec> {
        FileSpec::parse_list(&value).unwrap()
    }

    #[test]
    fn parses_all_variants() {
        let parsed = specs(json!([
            "dist/app.js",
            {"src/lib.rs": "lib.rs", "LICENSE": "LICENSE.txt"},
            "{release}/tool.exe",
            {"{release}/tool-{version}.zip": {"bin/tool": "tool"}},
            {"{release}/docs.tar.gz": ["README.md"]}
        ]));

        assert_eq!(
            parsed,
            vec![
                FileSpec::Path("dist/app.js".into()),
                FileSpec::Rename {
                    remote: "src/lib.rs".into(),
                    local: "lib.rs".into()
                },
                FileSpec::Rename {
                    remote: "LICENSE".into(),
                    local: "LICENSE.txt".into()
                },
                FileSpec::Release {
                    remote: "{release}/tool.exe".into(),
                    output: ReleaseOutput::Rename("tool.exe".into())
                },
                FileSpec::Release {
                    remote: "{release}/tool-{version}.zip".into(),
                    output: ReleaseOutput::Extract(vec![("bin/tool".into(), "tool".into())])
                },
                FileSpec::Release {
                    remote: "{release}/docs.tar.gz".into(),
                    output: ReleaseOutput::ExtractList(vec![ExtractItem::Keep("README.md".into())])
                },
            ]
        );
    }

    #[test]
    fn mixed_extraction_list_keeps_and_renames() {
        let parsed = specs(json!([{"{release}/pkg.zip": ["b.dll", {"a.exe": "app.exe"}]}]));
        assert_eq!(
            parsed,
            vec![FileSpec::Release {
                remote: "{release}/pkg.zip".into(),
                output: ReleaseOutput::ExtractList(vec![
                    ExtractItem::Keep("b.dll".into()),
                    ExtractItem::Rename(vec![("a.exe".into(), "app.exe".into())]),
                ])
            }]
        );

        let shape = normalize(&parsed, "v1.0.0");
        assert_eq!(
            shape.lock_shape["{release}/pkg.zip"],
            LockTarget::Archive(BTreeMap::from([
                ("a.exe".to_string(), "app.exe".to_string()),
                ("b.dll".to_string(), "b.dll".to_string()),
            ]))
        );
        assert_eq!(shape.flat_names, vec!["app.exe", "b.dll"]);
    }

    #[test]
    fn extraction_list_rejects_numbers() {
        let err = FileSpec::parse_list(&json!([{"{release}/pkg.zip": ["b.dll", 3]}])).unwrap_err();
        assert!(err.contains("pkg.zip"), "got: {err}");
    }

    #[test]
    fn same_remote_keeps_every_destination() {
        let shape = normalize(&specs(json!(["README.md", {"README.md": "docs.md"}])), "v1.0.0");

        assert_eq!(
            shape.lock_shape,
            LockShape::from([(
                "README.md".to_string(),
                LockTarget::Files(vec!["README.md".into(), "docs.md".into()])
            )])
        );
        assert_eq!(shape.flat_names, vec!["README.md", "docs.md"]);
        assert_eq!(
            serde_json::to_value(&shape.lock_shape).unwrap(),
            json!({"README.md": ["README.md", "docs.md"]})
        );
    }

    #[test]
    fn same_remote_archives_merge_members() {
        let shape = normalize(
            &specs(json!([
                {"{release}/pkg.zip": {"a.exe": "app.exe"}},
                {"{release}/pkg.zip": ["b.dll"]}
            ])),
            "v1.0.0",
        );
        assert_eq!(flatten(&shape.lock_shape), vec!["app.exe", "b.dll"]);
        assert_eq!(shape.flat_names, vec!["app.exe", "b.dll"]);
    }

    #[test]
    fn unsafe_destinations_are_found() {
        let escaping = normalize(&specs(json!([{"README.md": "../../x.md"}])), "1.0.0");
        assert_eq!(unsafe_path(&escaping.lock_shape), Some("../../x.md"));

        let member = normalize(&specs(json!([{"{release}/a.zip": {"../a.exe": "a.exe"}}])), "1.0.0");
        assert_eq!(unsafe_path(&member.lock_shape), Some("../a.exe"));

        let fine = normalize(&specs(json!(["docs/README.md"])), "1.0.0");
        assert_eq!(unsafe_path(&fine.lock_shape), None);
    }

    #[test]
    fn extraction_map_requires_release_prefix() {
        let err = FileSpec::parse_list(&json!([{"archive.zip": {"a": "b"}}])).unwrap_err();
        assert!(err.contains("archive.zip"), "got: {err}");
    }

    #[test]
    fn rejects_non_string_entries() {
        assert!(FileSpec::parse_list(&json!([42])).is_err());
        assert!(FileSpec::parse_list(&json!("README.md")).is_err());
    }

    #[test]
    fn normalize_substitutes_everywhere() {
        let shape = normalize(
            &specs(json!([
                "docs/guide-{version}.md",
                {"{release}/tool-{version}.zip": {"tool-{version}/tool": "bin/tool-{version}"}}
            ])),
            "v2.3.0",
        );

        let mut expected = LockShape::new();
        expected.insert(
            "docs/guide-2.3.0.md".into(),
            LockTarget::File("guide-2.3.0.md".into()),
        );
        expected.insert(
            "{release}/tool-2.3.0.zip".into(),
            LockTarget::Archive(BTreeMap::from([(
                "tool-2.3.0/tool".to_string(),
                "bin/tool-2.3.0".to_string(),
            )])),
        );
        assert_eq!(shape.lock_shape, expected);
        assert_eq!(shape.flat_names, vec!["guide-2.3.0.md", "bin/tool-2.3.0"]);
    }

    #[test]
    fn bare_list_reuses_member_names() {
        let shape = normalize(
            &specs(json!([{"{release}/pkg.tar": ["a.exe", "lib/b.dll"]}])),
            "1.0.0",
        );
        assert_eq!(shape.flat_names, vec!["a.exe", "lib/b.dll"]);
    }

    #[test]
    fn lock_shape_serializes_like_declarations() {
        let shape = normalize(
            &specs(json!(["README.md", {"{release}/a.zip": {"a.exe": "app.exe"}}])),
            "v1.0.0",
        );
        assert_eq!(
            serde_json::to_value(&shape.lock_shape).unwrap(),
            json!({"README.md": "README.md", "{release}/a.zip": {"a.exe": "app.exe"}})
        );
    }

    #[test]
    fn to_value_round_trips() {
        let original = json!([
            "README.md",
            {"src/lib.rs": "lib.rs"},
            "{release}/tool.exe",
            {"{release}/tool.exe": "bin/tool.exe"},
            {"{release}/a.zip": {"a.exe": "app.exe"}},
            {"{release}/b.zip": ["b.dll"]},
            {"{release}/c.zip": ["c.dll", {"c.exe": "tool.exe"}]}
        ]);
        let parsed = specs(original.clone());
        let rendered = Value::Array(parsed.iter().map(FileSpec::to_value).collect());
        assert_eq!(rendered, original);
    }

    #[test]
    fn conflicting_member_detected() {
        let spec = FileSpec::Release {
            remote: "{release}/a.zip".into(),
            output: ReleaseOutput::Extract(vec![
                ("a.exe".into(), "one.exe".into()),
                ("a.exe".into(), "two.exe".into()),
            ]),
        };
        let conflict = remote_conflict(&[spec]).unwrap();
        assert!(conflict.contains("a.exe"), "got: {conflict}");

        let same = FileSpec::Release {
            remote: "{release}/a.zip".into(),
            output: ReleaseOutput::Extract(vec![
                ("a.exe".into(), "one.exe".into()),
                ("a.exe".into(), "one.exe".into()),
            ]),
        };
        assert_eq!(remote_conflict(&[same]), None);
    }

    #[test]
    fn conflicts_across_specs_detected() {
        let across = specs(json!([
            {"{release}/a.zip": {"a.exe": "one.exe"}},
            {"{release}/a.zip": ["a.exe"]}
        ]));
        assert!(remote_conflict(&across).is_some());

        let mixed = specs(json!(["{release}/a.zip", {"{release}/a.zip": ["a.exe"]}]));
        let conflict = remote_conflict(&mixed).unwrap();
        assert!(conflict.contains("both as a file and as an archive"), "got: {conflict}");

        let renamed_twice = specs(json!(["README.md", {"README.md": "docs.md"}]));
        assert_eq!(remote_conflict(&renamed_twice), None);
    }
}
