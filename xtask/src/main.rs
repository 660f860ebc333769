use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::f64::consts::PI;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use wigner_rs::grid::UniformGrid;
use wigner_rs::kernel::KernelLifecycle;
use wigner_rs::plot::python_imshow_to_path;
use wigner_rs::render::magnitude_image;
use wigner_rs::signal::traits::PseudoWigner2D;
use wigner_rs::signal::wigner::{PseudoWignerConfig, PseudoWignerKernel, TransformLengthRule};
use wigner_rs::Complex;

const DEFAULT_PYTHON_BIN: &str = "python";

/// numpy reference of the kernel: same `N`, `Q`, offset, and phase conventions.
const PY_WIGNER_SCRIPT: &str = r#"
import json
import math
import sys
import time
import numpy as np

env = json.loads(sys.stdin.read())
iters = int(env["iters"])
p = env["payload"]
x = eval("lambda t: " + p["expr"], {"np": np, "pi": np.pi})

def _offset(f0, df):
    r = f0 / df
    k = round(r)
    if abs(r - k) <= 1e-9 * max(abs(k), 1.0):
        return int(k)
    return int(math.floor(r))

def _compute():
    T = np.asarray(p["times"], dtype=float)
    F = np.asarray(p["freqs"], dtype=float)
    dt = T[1] - T[0]
    df = F[1] - F[0]
    bins = (1 / dt) * (1 / df)
    N = int(math.trunc(bins)) if p["truncate"] else int(round(bins))
    f_offset = _offset(F[0], df)
    X = np.zeros((len(T), len(F)), dtype="D")
    m = np.arange(len(F))
    for n in range(len(T)):
        Q = min(n, len(T) - 1 - n)
        q = np.arange(0, 2 * Q + 1)
        c1 = x((n + q - Q) * dt + T[0]) * x((n - q + Q) * dt + T[0])
        c1 = np.concatenate((np.asarray(c1, dtype="D"), np.zeros(N - 2 * Q - 1)))
        C1 = np.fft.fft(c1)
        phase = np.exp(2j * np.pi * (m * df + f_offset * df) * Q / N)
        X[n, :] = 2 * dt * phase * C1[(m + f_offset) % N]
    return X

X = _compute()

t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "re": X.real.reshape(-1).tolist(),
    "im": X.imag.reshape(-1).tolist(),
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__,
}))
"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct PythonEval {
    re: Vec<f64>,
    im: Vec<f64>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ContractRow {
    case_id: String,
    rows: usize,
    cols: usize,
    transform_len: usize,
    pearson_r_magnitude: f64,
    max_abs: f64,
    rmse: f64,
    rust_ns: f64,
    python_ns: f64,
    speedup_vs_python: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    rows: Vec<ContractRow>,
}

/// One contract case: a signal written twice, once as a Rust closure and once
/// as a numpy expression in `t`.
struct Case {
    id: &'static str,
    expr: &'static str,
    signal: fn(f64) -> f64,
    times: (f64, f64, f64),
    freqs: (f64, f64, f64),
    length_rule: TransformLengthRule,
}

fn tone(t: f64) -> f64 {
    (2.0 * PI * t).cos()
}

fn chirp(t: f64) -> f64 {
    (2.0 * PI * (0.5 * t + 0.35 * t * t)).cos()
}

fn gauss_pulse(t: f64) -> f64 {
    (-(t - 2.5) * (t - 2.5) * 2.0).exp() * (2.0 * PI * 3.0 * t).sin()
}

fn two_tones(t: f64) -> f64 {
    (2.0 * PI * 0.75 * t).sin() + 0.5 * (2.0 * PI * 2.5 * t).cos()
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            id: "tone_1hz_reference_grid",
            expr: "np.cos(2 * pi * t)",
            signal: tone,
            times: (0.0, 30.0, 0.05),
            freqs: (-10.0, 10.0, 0.01),
            length_rule: TransformLengthRule::Round,
        },
        Case {
            id: "chirp_positive_band",
            expr: "np.cos(2 * pi * (0.5 * t + 0.35 * t * t))",
            signal: chirp,
            times: (0.0, 10.0, 0.05),
            freqs: (0.0, 10.0, 0.02),
            length_rule: TransformLengthRule::Round,
        },
        Case {
            id: "gauss_pulse_offgrid_start",
            expr: "np.exp(-(t - 2.5) * (t - 2.5) * 2.0) * np.sin(2 * pi * 3.0 * t)",
            signal: gauss_pulse,
            times: (0.0, 5.0, 0.025),
            freqs: (-7.013, 7.0, 0.05),
            length_rule: TransformLengthRule::Round,
        },
        Case {
            id: "two_tones_truncated_length",
            expr: "np.sin(2 * pi * 0.75 * t) + 0.5 * np.cos(2 * pi * 2.5 * t)",
            signal: two_tones,
            times: (0.0, 6.0, 0.03),
            freqs: (-8.0, 8.0, 0.03),
            length_rule: TransformLengthRule::Truncate,
        },
    ]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("contracts") => run_contracts(),
        Some("demo") => run_demo(args.next().map(PathBuf::from)),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- contracts");
            eprintln!("  cargo run -p xtask -- demo [output.png]");
            Ok(())
        }
    }
}

fn run_demo(output: Option<PathBuf>) -> Result<()> {
    let times = UniformGrid::arange(0.0, 30.0, 0.05)?;
    let freqs = UniformGrid::arange(-10.0, 10.0, 0.01)?;
    let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(times, freqs))?;

    let start = Instant::now();
    let x = kernel
        .run_alloc(&tone)
        .map_err(|e| anyhow!("demo distribution failed: {e}"))?;
    tracing::info!(
        shape = ?x.dim(),
        transform_len = kernel.transform_len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "computed pseudo Wigner distribution of a 1 Hz tone"
    );

    let image = magnitude_image(&x, kernel.times(), kernel.freqs(), 500.0)?;
    let output = output.unwrap_or_else(|| PathBuf::from("target/demo/wigner_tone.png"));
    let path = python_imshow_to_path(&image, Some(&output))
        .with_context(|| format!("rendering {}", output.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_contracts() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    fs::create_dir_all(&out_dir).context("creating contract output directory")?;

    let python_bin = detect_python_bin();
    let mut rows = Vec::new();
    let mut versions = None;

    for case in cases() {
        let times = UniformGrid::arange(case.times.0, case.times.1, case.times.2)?;
        let freqs = UniformGrid::arange(case.freqs.0, case.freqs.1, case.freqs.2)?;
        let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig {
            length_rule: case.length_rule,
            ..PseudoWignerConfig::new(times.clone(), freqs.clone())
        })
        .with_context(|| format!("configuring case {}", case.id))?;

        let signal = case.signal;
        let candidate = kernel
            .run_alloc(&signal)
            .map_err(|e| anyhow!("case {} execution failed: {e}", case.id))?;
        let rust_ns = benchmark_avg_ns(5, || {
            kernel
                .run_alloc(&signal)
                .map(|_| ())
                .map_err(|e| anyhow!("case {} benchmark failed: {e}", case.id))
        })?;

        let py = python_wigner_eval(
            &python_bin,
            json!({
                "expr": case.expr,
                "times": times.samples(),
                "freqs": freqs.samples(),
                "truncate": case.length_rule == TransformLengthRule::Truncate,
            }),
            2,
        )
        .with_context(|| format!("python reference for case {}", case.id))?;

        rows.push(build_row(case.id, &kernel, &candidate, &py, rust_ns)?);
        tracing::info!(case = case.id, "contract case recorded");
        versions.get_or_insert((py.python_version, py.numpy_version));
    }

    let (python_version, numpy_version) = versions.unwrap_or_default();
    let bundle = ContractBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version,
        numpy_version,
        rows,
    };
    let summary_json = out_dir.join("summary.json");
    fs::write(
        &summary_json,
        serde_json::to_vec_pretty(&bundle).context("serializing contract summary")?,
    )
    .with_context(|| format!("writing {}", summary_json.display()))?;
    write_summary_csv(&out_dir.join("summary.csv"), &bundle.rows)?;

    println!("Contract artifacts:");
    println!("  - {}", summary_json.display());
    println!("  - {}", out_dir.join("summary.csv").display());
    println!("  - cases: {}", bundle.rows.len());
    for row in &bundle.rows {
        println!(
            "  {:<32} r={:.9} max_abs={:.3e} speedup={:.1}x",
            row.case_id, row.pearson_r_magnitude, row.max_abs, row.speedup_vs_python
        );
    }
    Ok(())
}

fn detect_python_bin() -> PathBuf {
    std::env::var_os("PYTHON")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON_BIN))
}

fn python_wigner_eval(
    python_bin: &Path,
    payload: serde_json::Value,
    iters: usize,
) -> Result<PythonEval> {
    let env = json!({ "iters": iters, "payload": payload });
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(PY_WIGNER_SCRIPT)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;

    {
        let stdin = child.stdin.as_mut().context("opening python stdin")?;
        let payload_bytes = serde_json::to_vec(&env).context("serializing python payload")?;
        stdin
            .write_all(&payload_bytes)
            .context("writing payload to python stdin")?;
    }

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("python execution failed: {stderr}");
    }
    let stdout = String::from_utf8(output.stdout).context("parsing python stdout utf8")?;
    let parsed: PythonEval = serde_json::from_str(stdout.trim()).context("parsing python json")?;
    Ok(parsed)
}

fn benchmark_avg_ns<F>(iters: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters as f64)
}

fn build_row(
    case_id: &str,
    kernel: &PseudoWignerKernel,
    candidate: &Array2<Complex<f64>>,
    py: &PythonEval,
    rust_ns: f64,
) -> Result<ContractRow> {
    let (rows, cols) = candidate.dim();
    if py.re.len() != rows * cols || py.im.len() != rows * cols {
        bail!(
            "case {case_id} has mismatched output lengths: rust={}, python={}",
            rows * cols,
            py.re.len()
        );
    }
    // Row-major on both sides.
    let reference: Vec<Complex<f64>> = py
        .re
        .iter()
        .zip(py.im.iter())
        .map(|(re, im)| Complex::new(*re, *im))
        .collect();
    let ours: Vec<Complex<f64>> = candidate.iter().copied().collect();

    let mag_ours: Vec<f64> = ours.iter().map(|v| v.norm()).collect();
    let mag_ref: Vec<f64> = reference.iter().map(|v| v.norm()).collect();
    let diffs: Vec<f64> = ours
        .iter()
        .zip(reference.iter())
        .map(|(a, b)| (a - b).norm())
        .collect();

    Ok(ContractRow {
        case_id: case_id.to_string(),
        rows,
        cols,
        transform_len: kernel.transform_len(),
        pearson_r_magnitude: pearson(&mag_ours, &mag_ref),
        max_abs: diffs.iter().copied().fold(0.0, f64::max),
        rmse: (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt(),
        rust_ns,
        python_ns: py.avg_ns,
        speedup_vs_python: py.avg_ns / rust_ns,
    })
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = *x - mean_a;
        let db = *y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        if a == b {
            1.0
        } else {
            0.0
        }
    } else {
        cov / (var_a.sqrt() * var_b.sqrt())
    }
}

fn write_summary_csv(path: &Path, rows: &[ContractRow]) -> Result<()> {
    let mut out = String::new();
    out.push_str("case_id,rows,cols,transform_len,pearson_r_magnitude,max_abs,rmse,rust_ns,python_ns,speedup_vs_python\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{:.12},{:.12},{:.12},{:.3},{:.3},{:.6}\n",
            row.case_id,
            row.rows,
            row.cols,
            row.transform_len,
            row.pearson_r_magnitude,
            row.max_abs,
            row.rmse,
            row.rust_ns,
            row.python_ns,
            row.speedup_vs_python
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
