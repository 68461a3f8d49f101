// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 校验任务的有界并发调度
pub mod validation_queue;
pub mod validator_task;
