//! Property-name vocabulary.
//!
//! Names are plain `&'static str` so that unknown, user-supplied names can
//! share the same maps. Indexed families (`DEPEND_k`, `BUNDLE_k`, ...) have
//! helpers returning the static name for an index.

use crate::value::ValueKind;

pub const UNITS: &str = "UNITS";
pub const DEPEND_0: &str = "DEPEND_0";
pub const DEPEND_1: &str = "DEPEND_1";
pub const DEPEND_2: &str = "DEPEND_2";
pub const DEPEND_3: &str = "DEPEND_3";
pub const BUNDLE_0: &str = "BUNDLE_0";
pub const BUNDLE_1: &str = "BUNDLE_1";
pub const BUNDLE_2: &str = "BUNDLE_2";
pub const BUNDLE_3: &str = "BUNDLE_3";
pub const BINS_0: &str = "BINS_0";
pub const BINS_1: &str = "BINS_1";
pub const DELTA_PLUS: &str = "DELTA_PLUS";
pub const DELTA_MINUS: &str = "DELTA_MINUS";
pub const BIN_PLUS: &str = "BIN_PLUS";
pub const BIN_MINUS: &str = "BIN_MINUS";
pub const VALID_MIN: &str = "VALID_MIN";
pub const VALID_MAX: &str = "VALID_MAX";
pub const TYPICAL_MIN: &str = "TYPICAL_MIN";
pub const TYPICAL_MAX: &str = "TYPICAL_MAX";
pub const FILL_VALUE: &str = "FILL_VALUE";
pub const CADENCE: &str = "CADENCE";
pub const LABEL: &str = "LABEL";
pub const TITLE: &str = "TITLE";
pub const NAME: &str = "NAME";
pub const QUBE: &str = "QUBE";
pub const MONOTONIC: &str = "MONOTONIC";
pub const WEIGHTS: &str = "WEIGHTS";
pub const CONTEXT_0: &str = "CONTEXT_0";
pub const CONTEXT_1: &str = "CONTEXT_1";
pub const RENDER_TYPE: &str = "RENDER_TYPE";
pub const METADATA: &str = "METADATA";
pub const METADATA_MODEL: &str = "METADATA_MODEL";
pub const USER_PROPERTIES: &str = "USER_PROPERTIES";
pub const JOIN_0: &str = "JOIN_0";
pub const SCALE_TYPE: &str = "SCALE_TYPE";
pub const FORMAT: &str = "FORMAT";
pub const CACHE_TAG: &str = "CACHE_TAG";

/// Number of `PLANE_k` side channels a dataset may carry.
pub const MAX_PLANE_COUNT: usize = 50;

/// Number of `CONTEXT_k` slots; enough for every dimension of a rank-4
/// dataset to be sliced away twice over.
pub const MAX_CONTEXT_COUNT: usize = 8;

const DEPENDS: [&str; 4] = [DEPEND_0, DEPEND_1, DEPEND_2, DEPEND_3];
const BUNDLES: [&str; 4] = [BUNDLE_0, BUNDLE_1, BUNDLE_2, BUNDLE_3];
const BINS: [&str; 2] = [BINS_0, BINS_1];
const CONTEXTS: [&str; MAX_CONTEXT_COUNT] = [
    CONTEXT_0, CONTEXT_1, "CONTEXT_2", "CONTEXT_3", "CONTEXT_4", "CONTEXT_5", "CONTEXT_6",
    "CONTEXT_7",
];
const PLANES: [&str; MAX_PLANE_COUNT] = [
    "PLANE_0", "PLANE_1", "PLANE_2", "PLANE_3", "PLANE_4", "PLANE_5", "PLANE_6", "PLANE_7",
    "PLANE_8", "PLANE_9", "PLANE_10", "PLANE_11", "PLANE_12", "PLANE_13", "PLANE_14", "PLANE_15",
    "PLANE_16", "PLANE_17", "PLANE_18", "PLANE_19", "PLANE_20", "PLANE_21", "PLANE_22",
    "PLANE_23", "PLANE_24", "PLANE_25", "PLANE_26", "PLANE_27", "PLANE_28", "PLANE_29",
    "PLANE_30", "PLANE_31", "PLANE_32", "PLANE_33", "PLANE_34", "PLANE_35", "PLANE_36",
    "PLANE_37", "PLANE_38", "PLANE_39", "PLANE_40", "PLANE_41", "PLANE_42", "PLANE_43",
    "PLANE_44", "PLANE_45", "PLANE_46", "PLANE_47", "PLANE_48", "PLANE_49",
];

/// Properties that must co-transform with their owning dataset.
pub const CORRELATIVES: [&str; 5] = [DELTA_PLUS, DELTA_MINUS, BIN_PLUS, BIN_MINUS, WEIGHTS];

/// Properties describing the values themselves; they survive every view
/// operation unless overridden.
pub const DIMENSION_PROPERTIES: [&str; 13] = [
    UNITS,
    LABEL,
    TITLE,
    NAME,
    FILL_VALUE,
    VALID_MIN,
    VALID_MAX,
    TYPICAL_MIN,
    TYPICAL_MAX,
    SCALE_TYPE,
    FORMAT,
    METADATA,
    METADATA_MODEL,
];

/// Properties describing the ordering or spacing of dimension 0.
pub const DIM0_PROPERTIES: [&str; 3] = [CADENCE, MONOTONIC, CACHE_TAG];

/// Properties copied from a bundle descriptor when a bundled column is
/// extracted.
pub const UNBUNDLE_PROPERTIES: [&str; 12] = [
    UNITS,
    LABEL,
    TITLE,
    NAME,
    FILL_VALUE,
    VALID_MIN,
    VALID_MAX,
    TYPICAL_MIN,
    TYPICAL_MAX,
    SCALE_TYPE,
    FORMAT,
    RENDER_TYPE,
];

/// `DEPEND_k`. Panics if `k >= MAX_RANK`.
pub fn depend(k: usize) -> &'static str {
    DEPENDS[k]
}

/// `BUNDLE_k`. Panics if `k >= MAX_RANK`.
pub fn bundle(k: usize) -> &'static str {
    BUNDLES[k]
}

/// `BINS_k` for `k < 2`, `None` otherwise.
pub fn bins(k: usize) -> Option<&'static str> {
    BINS.get(k).copied()
}

/// `CONTEXT_k` for `k < MAX_CONTEXT_COUNT`, `None` otherwise.
pub fn context(k: usize) -> Option<&'static str> {
    CONTEXTS.get(k).copied()
}

/// `PLANE_k` for `k < MAX_PLANE_COUNT`, `None` otherwise.
pub fn plane(k: usize) -> Option<&'static str> {
    PLANES.get(k).copied()
}

/// All `CONTEXT_k` names, in slot order.
pub fn contexts() -> impl Iterator<Item = &'static str> {
    CONTEXTS.iter().copied()
}

/// All `PLANE_k` names.
pub fn planes() -> impl Iterator<Item = &'static str> {
    PLANES.iter().copied()
}

/// Correlatives followed by every plane: everything that is a same-shape
/// side channel of its owner.
pub fn correlatives() -> impl Iterator<Item = &'static str> {
    CORRELATIVES.iter().copied().chain(planes())
}

/// Every known name, used when a property set has to be enumerated.
pub fn all() -> impl Iterator<Item = &'static str> {
    const OTHERS: [&str; 9] = [
        QUBE,
        RENDER_TYPE,
        USER_PROPERTIES,
        JOIN_0,
        DELTA_PLUS,
        DELTA_MINUS,
        BIN_PLUS,
        BIN_MINUS,
        WEIGHTS,
    ];
    DIMENSION_PROPERTIES
        .iter()
        .chain(DIM0_PROPERTIES.iter())
        .chain(OTHERS.iter())
        .chain(DEPENDS.iter())
        .chain(BUNDLES.iter())
        .chain(BINS.iter())
        .chain(CONTEXTS.iter())
        .chain(PLANES.iter())
        .copied()
}

pub fn is_dimension_property(name: &str) -> bool {
    DIMENSION_PROPERTIES.contains(&name)
}

pub fn is_dim0_property(name: &str) -> bool {
    DIM0_PROPERTIES.contains(&name)
}

pub fn is_context(name: &str) -> bool {
    CONTEXTS.contains(&name)
}

/// Index `k` if `name` is `DEPEND_k`.
pub fn depend_index(name: &str) -> Option<usize> {
    DEPENDS.iter().position(|n| *n == name)
}

/// Index `k` if `name` is `BUNDLE_k`.
pub fn bundle_index(name: &str) -> Option<usize> {
    BUNDLES.iter().position(|n| *n == name)
}

/// Index `k` if `name` is `BINS_k`.
pub fn bins_index(name: &str) -> Option<usize> {
    BINS.iter().position(|n| *n == name)
}

/// True for names whose meaning is tied to a dimension number or to the
/// exact shape of the owner. These are re-derived by every view and never
/// forwarded blindly.
pub fn is_structural(name: &str) -> bool {
    depend_index(name).is_some()
        || bundle_index(name).is_some()
        || bins_index(name).is_some()
        || CORRELATIVES.contains(&name)
        || PLANES.contains(&name)
        || name == QUBE
        || name == JOIN_0
}

/// The value kind a known property is expected to carry. Unknown names are
/// untyped.
pub fn expected_kind(name: &str) -> Option<ValueKind> {
    if is_structural(name) && name != QUBE && name != JOIN_0 && bins_index(name).is_none() {
        return Some(ValueKind::DataSet);
    }
    if is_context(name) {
        return Some(ValueKind::DataSet);
    }
    match name {
        CADENCE => Some(ValueKind::DataSet),
        UNITS => Some(ValueKind::Units),
        LABEL | TITLE | NAME | BINS_0 | BINS_1 | RENDER_TYPE | SCALE_TYPE | FORMAT
        | METADATA_MODEL => Some(ValueKind::String),
        VALID_MIN | VALID_MAX | TYPICAL_MIN | TYPICAL_MAX | FILL_VALUE => Some(ValueKind::Number),
        METADATA | USER_PROPERTIES | CACHE_TAG => Some(ValueKind::Map),
        QUBE | MONOTONIC | JOIN_0 => Some(ValueKind::Bool),
        _ => None,
    }
}
