// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 校验器模块
///
/// 以子进程方式调用外部合规校验工具，并把 XML 报告解析为校验结果
pub mod external;
pub mod report_parser;
pub mod traits;
