//! Translation of form options into `watermark` command-line arguments
//!
//! Argument order is fixed: the positional part
//! (`<pattern> <input> <mark> -s <output>`), then the common flags in table
//! order, then the flags of the selected pattern in table order.
//!
//! Switch options are emitted only when the value is exactly the string
//! `"true"`. `"True"`, `"TRUE"`, `"1"` and `""` all count as absent.
//! Valued options are forwarded verbatim whenever the key is present, even
//! when the value is empty or not a number; the tool owns defaults and
//! numeric validation.

use super::request::{Pattern, WatermarkOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagStyle {
    /// `flag value`
    Valued,
    /// `flag` alone, iff the value is `"true"`
    Switch,
}

#[derive(Debug)]
struct OptionFlag {
    key: &'static str,
    flag: &'static str,
    style: FlagStyle,
}

const fn valued(key: &'static str, flag: &'static str) -> OptionFlag {
    OptionFlag {
        key,
        flag,
        style: FlagStyle::Valued,
    }
}

const fn switch(key: &'static str, flag: &'static str) -> OptionFlag {
    OptionFlag {
        key,
        flag,
        style: FlagStyle::Switch,
    }
}

const COMMON_FLAGS: &[OptionFlag] = &[
    valued("opacity", "-o"),
    valued("angle", "-a"),
    valued("text_color", "-tc"),
    valued("text_font", "-tf"),
    valued("text_size", "-ts"),
    switch("unselectable", "--unselectable"),
    valued("image_scale", "-is"),
    switch("save_as_image", "--save-as-image"),
    valued("dpi", "--dpi"),
];

const GRID_FLAGS: &[OptionFlag] = &[
    valued("horizontal_boxes", "-h"),
    valued("vertical_boxes", "-v"),
    switch("margin", "-m"),
];

const INSERT_FLAGS: &[OptionFlag] = &[
    valued("x", "-x"),
    valued("y", "-y"),
    valued("horizontal_alignment", "-ha"),
];

fn pattern_flags(pattern: Pattern) -> &'static [OptionFlag] {
    match pattern {
        Pattern::Grid => GRID_FLAGS,
        Pattern::Insert => INSERT_FLAGS,
    }
}

fn push_flags(args: &mut Vec<String>, table: &[OptionFlag], options: &WatermarkOptions) {
    for entry in table {
        let Some(value) = options.get(entry.key) else {
            continue;
        };
        match entry.style {
            FlagStyle::Valued => {
                args.push(entry.flag.to_string());
                args.push(value.clone());
            }
            FlagStyle::Switch => {
                if value == "true" {
                    args.push(entry.flag.to_string());
                }
            }
        }
    }
}

/// Flags for `options` under `pattern`, in tool order.
///
/// Unrecognized keys are ignored.
pub fn option_flags(pattern: Pattern, options: &WatermarkOptions) -> Vec<String> {
    let mut args = Vec::new();
    push_flags(&mut args, COMMON_FLAGS, options);
    push_flags(&mut args, pattern_flags(pattern), options);
    args
}

/// The watermark positional argument
#[derive(Debug, Clone, Copy)]
pub enum MarkArg<'a> {
    /// Literal watermark text
    Text(&'a str),
    /// Path of the staged watermark image
    Image(&'a Path),
}

/// A fully built `watermark` command line, without the program name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkInvocation {
    pattern: Pattern,
    output: PathBuf,
    args: Vec<String>,
}

impl WatermarkInvocation {
    pub fn build(
        pattern: Pattern,
        input: &Path,
        mark: MarkArg<'_>,
        output: &Path,
        options: &WatermarkOptions,
    ) -> Self {
        let mark = match mark {
            MarkArg::Text(text) => text.to_string(),
            MarkArg::Image(path) => path.display().to_string(),
        };

        let mut args = vec![
            pattern.as_str().to_string(),
            input.display().to_string(),
            mark,
            "-s".to_string(),
            output.display().to_string(),
        ];
        args.extend(option_flags(pattern, options));

        Self {
            pattern,
            output: output.to_path_buf(),
            args,
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Where the tool is told to write its result
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}
