// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Thetis-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Thetis and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bidirectional mapping between the flat change log and the nested
//! interchange document.

pub mod export;
pub mod import;

pub use export::export_document;
pub use import::{default_board_change, import_document, is_import_document};
