// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave list`

use crate::context;
use crate::exit::{CommandError, EXIT_OK};
use std::path::Path;
use wave_manifest::Loader;

pub fn personas(loader: &Loader, manifest_path: &Path) -> Result<i32, CommandError> {
    let manifest = loader.load_manifest(manifest_path)?;
    for (name, persona) in &manifest.personas {
        let description = persona.description.as_deref().unwrap_or("-");
        println!("{name:<20} adapter={:<12} {description}", persona.adapter);
    }
    Ok(EXIT_OK)
}

pub fn pipelines(loader: &Loader, manifest_path: &Path) -> Result<i32, CommandError> {
    let manifest = loader.load_manifest(manifest_path)?;
    for path in context::pipeline_files(&manifest) {
        match loader.load_pipeline(&path, &manifest) {
            Ok(pipeline) => {
                let description = pipeline.metadata.description.as_deref().unwrap_or("-");
                let state = if pipeline.metadata.disabled {
                    "disabled"
                } else if pipeline.metadata.release {
                    "release"
                } else {
                    "dev"
                };
                println!(
                    "{:<20} {:<8} {} step(s)  {description}",
                    pipeline.name(),
                    state,
                    pipeline.steps.len()
                );
            }
            Err(err) => {
                println!("{:<20} INVALID  {err}", path.display());
            }
        }
    }
    Ok(EXIT_OK)
}
