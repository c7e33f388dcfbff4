// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The discovery loop shared by the arbiter and the controller:
//! informer-style list-and-watch over cluster image and pod objects,
//! debounced, with pod readiness gated on the phase poller.

pub mod debounce;
pub mod pod_poller;
pub mod watcher;

pub use watcher::ClusterWatcher;
