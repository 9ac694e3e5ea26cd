/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

use crate::api_client::BmcAddr;

pub struct ShardManager {
    shard: usize,
    shards_count: usize,
}

impl ShardManager {
    pub fn new(shard: usize, shards_count: usize) -> Self {
        Self {
            shard,
            shards_count,
        }
    }

    pub fn should_monitor(&self, endpoint: &BmcAddr) -> bool {
        if self.shards_count == 1 {
            return true;
        }

        let hash = self.hash_endpoint(endpoint);
        let assigned_pod = hash % self.shards_count;
        assigned_pod == self.shard
    }

    /// FNV-1a 64-bit
    fn hash_endpoint(&self, endpoint: &BmcAddr) -> usize {
        const FNV_PRIME: u64 = 1099511628211;
        const FNV_OFFSET_BASIS: u64 = 14695981039346656037;

        let mut hash = FNV_OFFSET_BASIS;
        let key = endpoint.hash_key();

        for byte in key.as_bytes() {
            hash = hash.wrapping_mul(FNV_PRIME);
            hash ^= *byte as u64;
        }

        hash as usize
    }
}
