/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Navigation data model: the immutable category tree and the per-branch
//! drill-down memory that sits on top of it.

pub mod branch_memory;
pub mod taxonomy;
