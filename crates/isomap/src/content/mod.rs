mod face_defs;

pub use face_defs::{
    check_face_key, load_face_manifest, parse_face_manifest, FaceDef, FaceKeyError, FaceManifest,
    FaceManifestError, FaceManifestErrorCode, SourceLocation,
};
