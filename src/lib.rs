//! # FOHS Verse
//!
//! Tools for a local SQLite store of scripture passages keyed by
//! fruit-of-the-spirit category ("FOHS": Love, Joy, Peace, ...).
//!
//! Each row of the `scriptures` table holds one passage in one translation.
//! The `scriptureIndex` column is a parenthesised reference ending in the
//! translation mnemonic, e.g. `(John 3:16 WEBUS)`. An English baseline
//! translation is complete; other translations are filled in from it.
//!
//! ## Architecture
//!
//! ```text
//!                       ┌──────────────┐
//!                       │  TextSource  │ rebuild / translate / remote
//!                       └──────┬───────┘
//!                              │
//! ┌───────────┐   ┌────────────▼───┐   ┌──────────┐
//! │ reference │──▶│   reconcile    │──▶│  SQLite  │
//! │  codec    │   │ baseline→target│   │scriptures│
//! └───────────┘   └────────────────┘   └────┬─────┘
//!                                           │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐        ┌──────────┐
//!                 │ backfill │        │ inspect  │
//!                 │(migrate) │        │(read-only)│
//!                 └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! fohs init                              # create the database
//! fohs migrate                           # add and fill languageKey
//! fohs reconcile --bible FSPAN           # report missing rows
//! fohs reconcile --bible FSPAN --insert  # fetch and write them
//! fohs inspect --bible FSPAN --csv -s id:languageKey
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`reference`] | Scripture index parsing and API reference encoding |
//! | [`models`] | Row types |
//! | [`store`] | Queries over the `scriptures` table |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation and the `languageKey` column |
//! | [`backfill`] | Localized language keys |
//! | [`resolver`] | Replacement-text sources |
//! | [`extract`] | Passage HTML to plain text |
//! | [`reconcile`] | Baseline-to-target reconciliation |
//! | [`inspect`] | Read-only reports and CSV export |

pub mod backfill;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod reference;
pub mod resolver;
pub mod store;
