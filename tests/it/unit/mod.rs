//! Unit tests for pdfshelf.

mod settings_tests;
