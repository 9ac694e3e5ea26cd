/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hickory_resolver::Name;
use hickory_resolver::config::{NameServerConfigGroup, ResolverOpts};

use crate::forge_resolver::read_resolv_conf;

const DEFAULT_PORT: u16 = 53;
const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

#[derive(Clone, Default)]
pub struct ForgeResolverConfig {
    pub inner: NameServerConfigGroup,
    pub search_domain: Vec<Name>,
    pub domain: Option<Name>,
}

#[derive(Clone, Debug)]
pub struct ForgeResolveConf {
    parsed_configuration: Option<resolv_conf::Config>,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolverError {
    #[error("Could not read resolv.conf at {path}: {error}")]
    CouldNotReadResolvConf { path: PathBuf, error: io::Error },
    #[error("Could not parse resolv.conf at {path}: {error}")]
    CouldNotParseResolvConf {
        path: PathBuf,
        error: resolv_conf::ParseError,
    },
    #[error("Error resolving host {string}: {error}")]
    InvalidHostString {
        string: String,
        error: hickory_resolver::proto::error::ProtoError,
    },
}

impl ForgeResolveConf {
    pub fn new(path: &Path) -> Result<Self, ResolverError> {
        let resolv_conf_file = Path::new(&path);
        let parsed_data = read_resolv_conf(resolv_conf_file)?;

        Ok(Self {
            parsed_configuration: Some(parsed_data),
        })
    }

    pub fn with_system_resolv_conf() -> Result<Self, ResolverError> {
        let resolv_conf_file = Path::new(RESOLV_CONF_PATH);
        let parsed_data = read_resolv_conf(resolv_conf_file)?;

        Ok(Self {
            parsed_configuration: Some(parsed_data),
        })
    }

    pub fn parsed_configuration(self) -> resolv_conf::Config {
        self.parsed_configuration.unwrap_or_default()
    }
}

impl ForgeResolverConfig {
    pub fn new() -> Self {
        Self {
            inner: NameServerConfigGroup::new(),
            search_domain: vec![],
            domain: None,
        }
    }
}

pub fn into_forge_resolver_config(
    parsed_config: resolv_conf::Config,
) -> Result<(ForgeResolverConfig, ResolverOpts), ResolverError> {
    let mut frc = ForgeResolverConfig::new();

    if let Some(domain) = parsed_config.get_domain() {
        frc.domain = Some(Name::from_str(domain.as_str()).map_err(|error| {
            ResolverError::InvalidHostString {
                string: domain.to_string(),
                error,
            }
        })?);
    } else {
        frc.domain = None
    }

    let ips: Vec<IpAddr> = parsed_config
        .get_nameservers_or_local()
        .into_iter()
        .map(|scoped_ip| -> IpAddr { scoped_ip.into() })
        .collect();

    let nameservers = NameServerConfigGroup::from_ips_clear(&ips, DEFAULT_PORT, false);

    if nameservers.is_empty() {
        tracing::warn!("no nameservers found in config");
    }

    for search_domain in parsed_config.get_last_search_or_domain() {
        // Ignore invalid search domains
        if search_domain == "--" {
            continue;
        }

        frc.search_domain
            .push(Name::from_str_relaxed(search_domain).map_err(|error| {
                ResolverError::InvalidHostString {
                    string: search_domain.to_string(),
                    error,
                }
            })?);
    }

    frc.inner = nameservers;

    // TODO: Allow passing through Custom ResolverOpts
    Ok((frc, ResolverOpts::default()))
}
