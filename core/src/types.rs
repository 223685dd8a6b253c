//! Shared primitive types used across the funnel.

/// One browser visit. Generated client-side, groups events; there is no
/// guaranteed end-of-session event (abandonment is silent).
pub type SessionId = String;

/// A/B-test variant code selecting funnel copy (e.g. "testbx9").
pub type VariantId = String;

/// Stable identifier of a registered lead.
pub type LeadId = String;
