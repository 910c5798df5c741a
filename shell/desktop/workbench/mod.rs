/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod surface;
pub mod surface_invariants;
pub mod surface_layout;
pub mod surface_sync;
pub mod view_state;
