// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施服务模块
///
/// 带重试的出站HTTP传输和基于它的完成通知
pub mod retrying_client;
pub mod webhook_notifier;
