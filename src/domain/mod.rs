// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits for the concepts shared by the
// preparer and the trainer:
//
//   artifact.rs — named, versioned bundles of files and the
//                 references used to look them up
//   media.rs    — example images logged alongside metrics
//   traits.rs   — the experiment tracker abstraction
//
// No Burn types, no file I/O, no network calls live here.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Artifacts, artifact references and published versions
pub mod artifact;

// Logged media (example digit images)
pub mod media;

// Core abstractions (traits) that other layers implement
pub mod traits;
