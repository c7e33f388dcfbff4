// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Types and helpers shared by the arbiter and the controller that don't
//! belong to either: the pull-spec/fingerprint scheme, the cluster-object
//! annotation schema, and the `ScanImage` record both sides track.

pub mod annotate;
pub mod fingerprint;
pub mod scanimage;

pub use annotate::{Annotator, ImageInfo};
pub use fingerprint::{Fingerprint, RequestId};
pub use scanimage::ScanImage;
