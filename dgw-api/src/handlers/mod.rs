// Copyright 2026 DGW Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Protocol operation handlers.

pub mod document;
pub mod listing;
pub mod stats;

pub use document::{create_document, delete_document, get_document};
pub use listing::{document_info, list_documents};
pub use stats::{mem_stats, prometheus_metrics, server_info};
