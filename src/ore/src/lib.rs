// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Small extensions to the standard library shared by the arbiter and the
//! controller.
//!
//! Nothing in here is specific to image scanning; it is the same kind of
//! "house style" helper crate every non-trivial async service accumulates:
//! a named-task spawn wrapper and a retry-with-backoff stream.

pub mod retry;
pub mod task;
