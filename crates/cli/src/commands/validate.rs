// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave validate`

use crate::context;
use crate::exit::{CommandError, EXIT_FAILURE, EXIT_OK};
use std::path::Path;
use wave_manifest::Loader;

pub fn execute(loader: &Loader, manifest_path: &Path, verbose: bool) -> Result<i32, CommandError> {
    let manifest = match loader.load_manifest(manifest_path) {
        Ok(manifest) => manifest,
        Err(err) => {
            println!("manifest: INVALID");
            println!("  {err}");
            return Ok(EXIT_FAILURE);
        }
    };
    println!("manifest: ok ({})", manifest.metadata.name);
    if verbose {
        for (name, adapter) in &manifest.adapters {
            println!("  adapter {name}: binary={} mode={}", adapter.binary, adapter.mode);
        }
        for (name, persona) in &manifest.personas {
            println!(
                "  persona {name}: adapter={} prompt={}",
                persona.adapter,
                persona.system_prompt_file.display()
            );
        }
    }

    let mut failures = 0usize;
    for path in context::pipeline_files(&manifest) {
        match loader.load_pipeline(&path, &manifest) {
            Ok(pipeline) => {
                let flags = match (pipeline.metadata.release, pipeline.metadata.disabled) {
                    (_, true) => " [disabled]",
                    (true, _) => " [release]",
                    _ => "",
                };
                println!(
                    "pipeline {}: ok ({} step(s)){flags}",
                    pipeline.name(),
                    pipeline.steps.len()
                );
                if verbose {
                    for step in &pipeline.steps {
                        println!("  step {} persona={}", step.id, step.persona);
                    }
                }
            }
            Err(err) => {
                failures += 1;
                println!("pipeline {}: INVALID", path.display());
                println!("  {err}");
            }
        }
    }

    Ok(if failures == 0 { EXIT_OK } else { EXIT_FAILURE })
}
