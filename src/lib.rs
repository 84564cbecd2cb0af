// SPDX-License-Identifier: Apache-2.0

#![allow(unexpected_cfgs)]

//! # xrm-engine — composition reconciliation engine
//!
//! `xrm-engine` is the reconciliation substrate for a Crossplane-style
//! composition control plane: it converges composite resources (XRs) into
//! trees of composed children, binds namespaced claims to those composites,
//! and runs one-shot function pipelines for Operations. The surrounding CLI,
//! package-extraction, RBAC-rendering, and webhook machinery that ships
//! alongside a full control plane extension is out of scope — this crate is
//! the three control loops (composite, claim, operation) and their shared
//! helpers.
//!
//! ## Modules
//!
//! - [`crd`] — the engine's own fixed CRDs: `Composition`,
//!   `CompositionRevision`, `Operation`, `Function`.
//! - [`xr`] / [`claim`] — typed accessors over the user-defined, dynamically
//!   discovered XR and Claim kinds.
//! - [`resolver`] — composition selection (spec.md §4.2).
//! - [`associator`] — template ↔ child association and garbage collection.
//! - [`render`] / [`patch`] / [`fieldpath`] — template rendering and the
//!   patch engine it runs on.
//! - [`readiness`] / [`connection`] / [`secrets`] — readiness evaluation and
//!   additive connection-secret publication.
//! - [`functions`] — the Function Runner gRPC client.
//! - [`reconcilers`] — the Composite, Claim, and Operation control loops.
//! - [`manager`] — wires the reconcilers onto `kube::runtime::Controller`.
//! - [`context`] — shared per-process state (client, reflector stores,
//!   metrics).
//! - [`errors`] — the error taxonomy reconcilers branch on (spec.md §7).
//! - [`metrics`] — Prometheus metrics.
//! - [`owner`] / [`labels`] / [`constants`] — small shared plumbing.

pub mod associator;
pub mod claim;
pub mod connection;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod fieldpath;
pub mod functions;
pub mod labels;
pub mod manager;
pub mod metrics;
pub mod owner;
pub mod patch;
pub mod readiness;
pub mod reconcilers;
pub mod render;
pub mod resolver;
pub mod secrets;
pub mod xr;
