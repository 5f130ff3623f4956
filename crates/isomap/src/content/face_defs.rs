use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

use crate::map::{Coverage, Face};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceManifestErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownAttribute,
    MissingAttribute,
    InvalidValue,
    DuplicateFace,
}

#[derive(Debug, Clone)]
pub struct FaceManifestError {
    pub code: FaceManifestErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for FaceManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for FaceManifestError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaceKeyError {
    #[error("face key is empty")]
    Empty,
    #[error("face key has an empty path segment")]
    EmptySegment,
    #[error("face key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

// A key is a path below `faces/` without the `.png` extension.
pub fn check_face_key(key: &str) -> Result<(), FaceKeyError> {
    if key.is_empty() {
        return Err(FaceKeyError::Empty);
    }
    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(FaceKeyError::EmptySegment);
        }
        let invalid = segment
            .chars()
            .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-')));
        if let Some(character) = invalid {
            return Err(FaceKeyError::InvalidCharacter { character });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceDef {
    pub num: u32,
    pub key: String,
    pub coverage: Coverage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceManifest {
    defs: BTreeMap<u32, FaceDef>,
}

impl FaceManifest {
    pub fn get(&self, num: u32) -> Option<&FaceDef> {
        self.defs.get(&num)
    }

    pub fn face(&self, num: u32) -> Face {
        match self.defs.get(&num) {
            Some(def) => Face::with_coverage(num, def.coverage),
            None => Face::new(num),
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaceDef> + '_ {
        self.defs.values()
    }
}

pub fn load_face_manifest(file_path: &Path) -> Result<FaceManifest, FaceManifestError> {
    let raw = fs::read_to_string(file_path).map_err(|error| FaceManifestError {
        code: FaceManifestErrorCode::ReadFile,
        message: format!("failed to read face manifest: {error}"),
        file_path: file_path.to_path_buf(),
        location: None,
    })?;
    parse_face_manifest(file_path, &raw)
}

pub fn parse_face_manifest(file_path: &Path, raw: &str) -> Result<FaceManifest, FaceManifestError> {
    let doc = Document::parse(raw).map_err(|error| FaceManifestError {
        code: FaceManifestErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Faces" {
        return Err(error_at_node(
            FaceManifestErrorCode::InvalidRoot,
            "root element must be <Faces>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut defs = BTreeMap::<u32, FaceDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "Face" {
            return Err(error_at_node(
                FaceManifestErrorCode::UnknownElement,
                format!("unsupported element <{}> in <Faces>", child.tag_name().name()),
                file_path,
                &doc,
                child,
            ));
        }
        let def = parse_face(file_path, &doc, child)?;
        if defs.contains_key(&def.num) {
            return Err(error_at_node(
                FaceManifestErrorCode::DuplicateFace,
                format!("face {} is listed more than once", def.num),
                file_path,
                &doc,
                child,
            ));
        }
        defs.insert(def.num, def);
    }

    Ok(FaceManifest { defs })
}

fn parse_face(file_path: &Path, doc: &Document<'_>, node: Node<'_, '_>) -> Result<FaceDef, FaceManifestError> {
    for attribute in node.attributes() {
        if !matches!(attribute.name(), "num" | "key" | "quad") {
            return Err(error_at_node(
                FaceManifestErrorCode::UnknownAttribute,
                format!("unknown attribute '{}' on <Face>", attribute.name()),
                file_path,
                doc,
                node,
            ));
        }
    }

    let num_text = required_attribute(file_path, doc, node, "num")?;
    let num = num_text.parse::<u32>().map_err(|_| {
        error_at_node(
            FaceManifestErrorCode::InvalidValue,
            format!("num '{num_text}' is not a face number"),
            file_path,
            doc,
            node,
        )
    })?;

    let key = required_attribute(file_path, doc, node, "key")?;
    check_face_key(&key).map_err(|error| {
        error_at_node(
            FaceManifestErrorCode::InvalidValue,
            format!("invalid key '{key}': {error}"),
            file_path,
            doc,
            node,
        )
    })?;

    let coverage = match node.attribute("quad").map(str::trim) {
        None => Coverage::ALL,
        Some(quad) => match quad.parse::<u8>() {
            Ok(bits) if bits <= Coverage::ALL.bits() => Coverage::from_bits(bits),
            _ => {
                return Err(error_at_node(
                    FaceManifestErrorCode::InvalidValue,
                    format!("quad '{quad}' must be a number from 0 to 7"),
                    file_path,
                    doc,
                    node,
                ))
            }
        },
    };

    Ok(FaceDef { num, key, coverage })
}

fn required_attribute(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<String, FaceManifestError> {
    let value = node.attribute(name).map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(error_at_node(
            FaceManifestErrorCode::MissingAttribute,
            format!("missing required attribute '{name}' on <Face>"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value.to_string())
}

fn error_at_node(
    code: FaceManifestErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> FaceManifestError {
    let pos = doc.text_pos_at(node.range().start);
    FaceManifestError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}
