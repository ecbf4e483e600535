// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use yinyue::{
  FRAME_SIZE, FromUrl,
  frame::RgbaFrame,
  input::InputWrapper,
  model::{HandPose, HandPoseBuilder, RecordedSession},
  output::OutputWrapper,
  task::{ContinuousTask, OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("推理会话: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let session = RecordedSession::from_url(&args.model)?;
  let builder = args.apply(HandPoseBuilder::from_url(&args.model)?);
  let model: HandPose<_, RgbaFrame<FRAME_SIZE, FRAME_SIZE>, FRAME_SIZE, FRAME_SIZE> =
    builder.build(session)?;

  let input = InputWrapper::<FRAME_SIZE, FRAME_SIZE>::from_url(&args.input)?;
  let output = OutputWrapper::<FRAME_SIZE, FRAME_SIZE>::from_url(&args.output)?;

  if args.once {
    OneShotTask.run_task(input, model, output)?;
  } else {
    ContinuousTask::default()
      .with_frame_number(args.frames)
      .run_task(input, model, output)?;
  }

  Ok(())
}
