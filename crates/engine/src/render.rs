use crate::timeline::{ticks_to_seconds, DurationFit, SceneSegment, VisualSource};

pub const OUTPUT_WIDTH: i32 = 1280;
pub const OUTPUT_HEIGHT: i32 = 720;
pub const OUTPUT_FPS: i32 = 24;

/// ffmpeg invocation for one intermediate file. The daemon runs these with
/// `ffmpeg <args>`; paths inside `args` are as given by the segment plan.
#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub args: Vec<String>,
    pub output: String,
}

fn s(v: &str) -> String {
    v.to_string()
}

/// Uniform encode settings so segment files concatenate with stream copy.
fn encode_args(out: &mut Vec<String>) {
    out.extend([
        s("-vf"),
        format!(
            "scale={}:{}:force_original_aspect_ratio=decrease,pad={}:{}:(ow-iw)/2:(oh-ih)/2,fps={},format=yuv420p",
            OUTPUT_WIDTH, OUTPUT_HEIGHT, OUTPUT_WIDTH, OUTPUT_HEIGHT, OUTPUT_FPS
        ),
        s("-c:v"),
        s("libx264"),
        s("-preset"),
        s("medium"),
        s("-crf"),
        s("23"),
        s("-c:a"),
        s("aac"),
        s("-b:a"),
        s("128k"),
        s("-ar"),
        s("44100"),
        s("-ac"),
        s("2"),
    ]);
}

/// Builds the ffmpeg command that realizes one finalized segment as a
/// self-contained mp4 of exactly `duration_ticks`.
pub fn segment_command(segment: &SceneSegment, output: &str) -> RenderCommand {
    let duration = format!("{:.3}", ticks_to_seconds(segment.duration_ticks));
    let mut args: Vec<String> = Vec::new();

    match &segment.visual {
        VisualSource::Clip { path, .. } => {
            if segment.fit == DurationFit::Looped {
                args.extend([s("-stream_loop"), s("-1")]);
            }
            args.extend([s("-i"), path.clone()]);
        }
        VisualSource::Still { path } => {
            args.extend([s("-loop"), s("1"), s("-framerate"), OUTPUT_FPS.to_string()]);
            args.extend([s("-i"), path.clone()]);
        }
        VisualSource::Placeholder { label } => {
            args.extend([
                s("-f"),
                s("lavfi"),
                s("-i"),
                format!(
                    "color=c=black:size={}x{}:rate={},drawtext=text='{}':fontcolor=white:fontsize=36:x=(w-text_w)/2:y=(h-text_h)/2",
                    OUTPUT_WIDTH,
                    OUTPUT_HEIGHT,
                    OUTPUT_FPS,
                    label.replace('\'', "").replace(':', "\\:")
                ),
            ]);
        }
    }

    match &segment.audio {
        Some(audio) => args.extend([s("-i"), audio.clone()]),
        None => {
            // Silent bed keeps an audio stream present for concat.
            args.extend([s("-f"), s("lavfi"), s("-i"), s("anullsrc=r=44100:cl=stereo")]);
        }
    }

    args.extend([s("-map"), s("0:v:0"), s("-map"), s("1:a:0")]);
    args.extend([s("-t"), duration]);
    encode_args(&mut args);
    args.extend([s("-y"), s(output)]);

    RenderCommand {
        args,
        output: output.to_string(),
    }
}

/// Builds the final concat-demuxer invocation over a list file whose entries
/// are the segment outputs in scene order.
pub fn concat_command(list_path: &str, output: &str) -> RenderCommand {
    RenderCommand {
        args: vec![
            s("-f"),
            s("concat"),
            s("-safe"),
            s("0"),
            s("-i"),
            s(list_path),
            s("-c"),
            s("copy"),
            s("-y"),
            s(output),
        ],
        output: output.to_string(),
    }
}

/// Contents of the concat-demuxer list file for a rendered segment set.
pub fn concat_list(segment_outputs: &[String]) -> String {
    let mut out = String::new();
    for path in segment_outputs {
        out.push_str(&format!("file '{}'\n", path.replace('\'', "'\\''")));
    }
    out
}
