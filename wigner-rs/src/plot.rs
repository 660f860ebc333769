use crate::render::MagnitudeImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors raised by plot utilities.
#[derive(Debug)]
pub enum PlotError {
    /// Underlying process or filesystem I/O failure.
    Io(std::io::Error),
    /// Python subprocess stdin was unavailable.
    StdinUnavailable,
    /// Python subprocess exited unsuccessfully.
    PythonExitFailure(ExitStatus),
}

impl core::fmt::Display for PlotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlotError::Io(err) => write!(f, "plot I/O failure: {err}"),
            PlotError::StdinUnavailable => {
                write!(f, "failed to open stdin for python plotting process")
            }
            PlotError::PythonExitFailure(status) => {
                write!(f, "python plotting script failed with status: {status}")
            }
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::Io(err) => Some(err),
            PlotError::StdinUnavailable | PlotError::PythonExitFailure(_) => None,
        }
    }
}

impl From<std::io::Error> for PlotError {
    fn from(value: std::io::Error) -> Self {
        PlotError::Io(value)
    }
}

/// Build the matplotlib script that draws `image` into `output_path`.
fn imshow_script(image: &MagnitudeImage, output_path: &Path) -> String {
    let rows: Vec<Vec<f64>> = image
        .pixels
        .outer_iter()
        .map(|row| row.to_vec())
        .collect();
    let extent = match image.extent {
        Some(e) => format!(
            "[{:?}, {:?}, {:?}, {:?}]",
            e.t_min, e.t_max, e.f_min, e.f_max
        ),
        None => "None".to_string(),
    };
    let output_path_literal = output_path.to_string_lossy().replace('\\', "\\\\");
    format!(
        r#"
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt

X = {:?}
extent = {}
fig = plt.figure(constrained_layout=True)
plt.imshow(X, cmap="gray", origin="lower", extent=extent, aspect="auto")
plt.xlabel("Time (Sec)")
plt.ylabel("Frequency (Hz)")
fig.savefig(r"{}", dpi=150)
plt.close(fig)
"#,
        rows, extent, output_path_literal
    )
}

/// Render a magnitude image as a grayscale PNG using python's matplotlib.
///
/// Frequency runs along the vertical axis with the origin at the bottom. When
/// `output_path` is `None` the PNG lands in `target/contracts/plots`.
///
/// Returns the output path when plotting succeeds.
pub fn python_imshow_to_path<P: AsRef<Path>>(
    image: &MagnitudeImage,
    output_path: Option<P>,
) -> Result<PathBuf, PlotError> {
    let output_path = match output_path {
        Some(path) => path.as_ref().to_path_buf(),
        None => {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            PathBuf::from(format!("target/contracts/plots/wigner_{ts}.png"))
        }
    };
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let script = imshow_script(image, &output_path);
    let mut python = std::process::Command::new("python")
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null()) // noisy
        .stderr(std::process::Stdio::null()) // noisy
        .spawn()?;

    if let Some(mut stdin) = python.stdin.take() {
        stdin.write_all(script.as_bytes())?;
    } else {
        return Err(PlotError::StdinUnavailable);
    }

    let status = python.wait()?;
    if !status.success() {
        return Err(PlotError::PythonExitFailure(status));
    }
    tracing::debug!(path = %output_path.display(), "wrote distribution image");
    Ok(output_path)
}
