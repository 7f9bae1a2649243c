// tests/asset_pipeline.rs

mod common;
use crate::common::{file_names, init_tracing, write_file, write_png};

use std::error::Error;
use std::fs;
use std::path::Path;

use buildweb::assets::{AssetContext, images, mapping, styles};
use buildweb::config::ProjectConfig;
use buildweb::errors::BuildwebError;
use buildweb::exec::Toolchain;
use buildweb_test_utils::builders::{AssetEntryBuilder, ProjectConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn config() -> ProjectConfig {
    ProjectConfigBuilder::new("webapp")
        .url_prefix("/static")
        .entry(AssetEntryBuilder::new("home").build())
        .build()
}

fn only_file(dir: &Path, suffix: &str) -> String {
    let matching: Vec<String> = file_names(dir)
        .into_iter()
        .filter(|name| name.ends_with(suffix))
        .collect();
    assert_eq!(matching.len(), 1, "expected one {suffix} in {dir:?}, got {matching:?}");
    matching[0].clone()
}

#[tokio::test]
async fn images_are_fingerprinted_and_sprites_packed() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_png(root, "assets/images/home/logo.png", 4, 4, [255, 0, 0, 255]);
    write_png(root, "assets/images/home/sprites@2x/arrow.png", 20, 10, [0, 255, 0, 255]);
    write_png(root, "assets/images/home/sprites@2x/close.png", 10, 6, [0, 0, 255, 255]);
    let cfg = config();
    let ctx = AssetContext::new(root, false, Toolchain::default());

    images::build(&ctx, &cfg, "home").await?;

    let out = root.join("public/images/home");
    let logo = only_file(&out, "-logo.png");
    let atlas = only_file(&out, "-sprites_2x.png");
    assert!(logo.starts_with("fp"));
    assert_eq!(file_names(&out).len(), 2);
    assert_eq!(image::image_dimensions(out.join(&atlas))?, (20, 16));

    let fragment = fs::read_to_string(root.join("assets/stylesheets/sprites/home_sprites_2x.styl"))?;
    assert!(fragment.contains("$home-sprites_2x-arrow = 0px 0px 10px 5px"));
    assert!(fragment.contains("$home-sprites_2x-close = 0px -5px 5px 3px"));
    assert!(fragment.contains(&format!("url(\"/static/images/home/{atlas}\")")));

    // Same sources, same names.
    images::build(&ctx, &cfg, "home").await?;
    assert_eq!(file_names(&out), {
        let mut names = vec![logo.clone(), atlas.clone()];
        names.sort();
        names
    });

    let map = mapping::regenerate(root, &cfg)?;
    assert_eq!(
        map.get("/images/home/logo.png"),
        Some(&format!("/static/images/home/{logo}"))
    );
    assert!(map.contains_key("/images/home/sprites_2x.png"));
    assert!(root.join("assets_map.json").is_file());
    Ok(())
}

#[tokio::test]
async fn entry_without_image_folder_is_not_found() -> TestResult {
    let dir = tempfile::tempdir()?;
    let ctx = AssetContext::new(dir.path(), false, Toolchain::default());

    let err = images::build(&ctx, &config(), "home").await.unwrap_err();

    assert!(matches!(err, BuildwebError::EntryNotFound(name) if name == "home"));
    Ok(())
}

#[tokio::test]
async fn stage_ordered_build_points_css_at_fingerprinted_images() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_png(root, "assets/images/home/logo.png", 2, 2, [1, 2, 3, 255]);
    write_file(
        root,
        "assets/stylesheets/home.css",
        "body { background: url('../images/home/logo.png'); }\n.x { background: url(/images/missing.png) }\n",
    );
    let cfg = config();
    let ctx = AssetContext::new(root, false, Toolchain::default());

    // Fresh tree, same order as a batch: images, stylesheets, mapping.
    images::build(&ctx, &cfg, "home").await?;
    styles::build(&ctx, &cfg, "home").await?;
    let map = mapping::regenerate(root, &cfg)?;

    let out = root.join("public/stylesheets");
    let first = only_file(&out, "-home.css");
    let css = fs::read_to_string(out.join(&first))?;
    let logo_url = &map["/images/home/logo.png"];
    assert!(css.contains(&format!("url(\"{logo_url}\")")));
    assert!(css.contains("url(/images/missing.png)"));

    // Unchanged sources are skipped and keep their output.
    styles::build(&ctx, &cfg, "home").await?;
    assert_eq!(only_file(&out, "-home.css"), first);

    // A new source replaces the old output.
    write_file(root, "assets/stylesheets/home.css", "body { margin: 0 }\n");
    styles::build(&ctx, &cfg, "home").await?;
    let second = only_file(&out, "-home.css");
    assert_ne!(second, first);
    Ok(())
}

#[cfg(unix)]
mod external_tools {
    use super::*;
    use buildweb::assets::scripts;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn script(root: &Path, name: &str, body: &str) -> PathBuf {
        let path = write_file(root, name, format!("#!/bin/sh\n{body}\n"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn stylus_runs_with_mode_and_mapping_env() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_file(root, "assets/stylesheets/home.styl", "body\n  margin 0\n");
        let stylus = script(
            root,
            "tools/stylus",
            r#"src="$3"; out="$5"; name=$(basename "$src" .styl)
printf 'env=%s map=%s\n' "$NODE_ENV" "$BUILDWEB_ASSETS_MAP" > "$out/$name.css""#,
        );
        let toolchain = Toolchain {
            stylus,
            ..Toolchain::default()
        };
        let ctx = AssetContext::new(root, true, toolchain);

        styles::build(&ctx, &config(), "home").await?;

        let out = root.join("public/stylesheets");
        let css = fs::read_to_string(out.join(only_file(&out, "-home.css")))?;
        assert!(css.contains("env=production"));
        assert!(css.contains(".buildweb/image_urls.json"));
        assert!(root.join(".buildweb/stylus-assets.js").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn stylus_sees_images_built_earlier_in_the_batch() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_png(root, "assets/images/home/logo.png", 3, 3, [9, 9, 9, 255]);
        write_file(root, "assets/stylesheets/home.styl", "body\n  background images('home/logo.png')\n");
        let stylus = script(
            root,
            "tools/stylus",
            r#"out="$5"; cp "$BUILDWEB_ASSETS_MAP" "$out/home.css""#,
        );
        let toolchain = Toolchain {
            stylus,
            ..Toolchain::default()
        };
        let cfg = config();
        let ctx = AssetContext::new(root, false, toolchain);

        images::build(&ctx, &cfg, "home").await?;
        styles::build(&ctx, &cfg, "home").await?;

        let logo = only_file(&root.join("public/images/home"), "-logo.png");
        let out = root.join("public/stylesheets");
        let urls = fs::read_to_string(out.join(only_file(&out, "-home.css")))?;
        assert!(urls.contains(&format!("/static/images/home/{logo}")));
        Ok(())
    }

    #[tokio::test]
    async fn development_stylus_output_is_source_mapped_and_stable() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_file(root, "assets/stylesheets/home.styl", "body\n  margin 0\n");
        let stylus = script(
            root,
            "tools/stylus",
            r#"out="$5"; printf 'body{margin:0}\n' > "$out/home.css"
for arg in "$@"; do
  if [ "$arg" = "--sourcemap-inline" ]; then
    printf '/*# sourceMappingURL=data:application/json;base64,e30= */\n' >> "$out/home.css"
  fi
done"#,
        );
        let toolchain = Toolchain {
            stylus,
            ..Toolchain::default()
        };
        let ctx = AssetContext::new(root, false, toolchain);
        let out = root.join("public/stylesheets");

        styles::build(&ctx, &config(), "home").await?;
        let first = only_file(&out, "-home.css");
        assert!(fs::read_to_string(out.join(&first))?.contains("sourceMappingURL=data:"));

        // Forget the recorded sources so stylus really runs again.
        fs::remove_file(root.join(".buildweb/sources.json"))?;
        styles::build(&ctx, &config(), "home").await?;

        assert_eq!(only_file(&out, "-home.css"), first);
        Ok(())
    }

    #[tokio::test]
    async fn bundler_failure_reports_stderr() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_file(root, "assets/javascripts/home.js", "require('./widgets')\n");
        let browserify = script(root, "tools/browserify", "echo \"Cannot find module './widgets'\" >&2; exit 1");
        let toolchain = Toolchain {
            browserify,
            ..Toolchain::default()
        };
        let ctx = AssetContext::new(root, false, toolchain);

        let err = scripts::build(&ctx, &config(), "home").await.unwrap_err();

        match err {
            BuildwebError::ToolFailed { tool, stderr, .. } => {
                assert_eq!(tool, "browserify");
                assert!(stderr.contains("Cannot find module"));
            }
            other => panic!("expected a tool failure, got {other:?}"),
        }
        assert!(!root.join("public/javascripts/home.js").exists());
        Ok(())
    }

    #[tokio::test]
    async fn bundle_is_written_to_the_last_argument() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_file(root, "assets/javascripts/home.js", "console.log(1)\n");
        let browserify = script(
            root,
            "tools/browserify",
            r#"for arg in "$@"; do out="$arg"; done
printf 'bundle env=%s\n' "$NODE_ENV" > "$out""#,
        );
        let toolchain = Toolchain {
            browserify,
            ..Toolchain::default()
        };
        let ctx = AssetContext::new(root, false, toolchain);

        scripts::build(&ctx, &config(), "home").await?;

        let out = root.join("public/javascripts");
        let js = fs::read_to_string(out.join(only_file(&out, "-home.js")))?;
        assert!(js.starts_with("bundle env="));
        Ok(())
    }
}
