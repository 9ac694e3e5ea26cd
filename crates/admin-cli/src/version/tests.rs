/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// The intent of the tests.rs file is to test the integrity of the
// command, including things like basic structure parsing, enum
// translations, and any external input validators that are
// configured. Specific "categories" are:
//
// Command Structure - Baseline debug_assert() of the entire command.
// Argument Parsing  - Ensure required/optional arg combinations parse correctly.

use clap::{CommandFactory, Parser};

use super::args::*;

// verify_cmd_structure runs a baseline clap debug_assert()
// to do basic command configuration checking and validation,
// ensuring things like unique argument definitions, group
// configurations, argument references, etc. Things that would
// otherwise be missed until runtime.
#[test]
fn verify_cmd_structure() {
    Opts::command().debug_assert();
}

/////////////////////////////////////////////////////////////////////////////
// Argument Parsing
//
// This section contains tests specific to argument parsing,
// including testing required arguments, as well as optional
// flag-specific checking.

// parse_no_args ensures parses with no arguments.
#[test]
fn parse_no_args() {
    let opts = Opts::try_parse_from(["version"]).expect("should parse with no args");

    assert!(!opts.show_runtime_config);
}

// parse_show_runtime_config_short ensures parses with -s flag.
#[test]
fn parse_show_runtime_config_short() {
    let opts = Opts::try_parse_from(["version", "-s"]).expect("should parse with -s");

    assert!(opts.show_runtime_config);
}

// parse_show_runtime_config_long ensures parses with
// --show-runtime-config flag.
#[test]
fn parse_show_runtime_config_long() {
    let opts = Opts::try_parse_from(["version", "--show-runtime-config"])
        .expect("should parse with --show-runtime-config");

    assert!(opts.show_runtime_config);
}
