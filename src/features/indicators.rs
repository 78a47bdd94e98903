//! Series primitives and technical indicators.
//!
//! Every function returns a vector aligned with its input, with NaN wherever the
//! value is undefined (warm-up windows, missing inputs).

/// Fractional change from the previous value.
pub fn pct_change(data: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] / data[i - 1] - 1.0;
    }
    out
}

pub fn diff(data: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] - data[i - 1];
    }
    out
}

/// Moves values `periods` rows later, padding the head with NaN.
pub fn shift(data: &[f64], periods: usize) -> Vec<f64> {
    let n = data.len();
    let mut out = vec![f64::NAN; n];
    if periods < n {
        out[periods..].copy_from_slice(&data[..n - periods]);
    }
    out
}

/// -1, 0 or 1; NaN stays NaN.
pub fn sign(value: f64) -> f64 {
    if value.is_nan() {
        f64::NAN
    } else if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Trailing mean over `window` values. A window holding NaN yields NaN.
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..data.len() {
        let slice = &data[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = slice.iter().sum::<f64>() / window as f64;
    }
    out
}

/// Trailing standard deviation with `ddof` delta degrees of freedom
/// (1 for the sample estimate, 0 for the population one).
pub fn rolling_std(data: &[f64], window: usize, ddof: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if window == 0 || window <= ddof {
        return out;
    }
    for i in (window - 1)..data.len() {
        let slice = &data[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance =
            slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window - ddof) as f64;
        out[i] = variance.sqrt();
    }
    out
}

pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

pub fn com_alpha(com: f64) -> f64 {
    1.0 / (1.0 + com)
}

/// Recursive exponential average: `y0 = x0`, `y_t = (1 - alpha) * y_{t-1} + alpha * x_t`.
///
/// Leading NaN stay NaN. A NaN after the first value repeats the previous average,
/// but the previous average keeps decaying across the gap, so the next observation
/// gets more weight than it would without the gap.
pub fn ewm(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(data.len());
    let mut weighted = f64::NAN;
    let mut old_weight = 1.0;
    for &x in data {
        if weighted.is_nan() {
            weighted = x;
        } else {
            old_weight *= 1.0 - alpha;
            if !x.is_nan() {
                weighted = (old_weight * weighted + alpha * x) / (old_weight + alpha);
                old_weight = 1.0;
            }
        }
        out.push(weighted);
    }
    out
}

/// Exponential average seeded with the simple mean of the first `period` values.
/// NaN before index `period - 1`.
pub fn ema_seeded(data: &[f64], period: usize) -> Vec<f64> {
    match data.iter().position(|v| !v.is_nan()) {
        Some(start) if period > 0 => ema_seeded_at(data, period, start + period - 1),
        _ => vec![f64::NAN; data.len()],
    }
}

/// Exponential average whose first value sits at `seed_index`, seeded with the mean
/// of the `period` values ending there. NaN before `seed_index`.
pub fn ema_seeded_at(data: &[f64], period: usize, seed_index: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if period == 0 || seed_index + 1 < period || seed_index >= data.len() {
        return out;
    }

    let alpha = span_alpha(period);
    let mut prev = data[seed_index + 1 - period..=seed_index].iter().sum::<f64>() / period as f64;
    out[seed_index] = prev;
    for i in seed_index + 1..data.len() {
        prev = (1.0 - alpha) * prev + alpha * data[i];
        out[i] = prev;
    }
    out
}

/// RSI from recursively smoothed gains and losses (`com = period - 1`).
pub fn rsi_recursive(close: &[f64], period: usize) -> Vec<f64> {
    let delta = diff(close);
    let gain: Vec<f64> = delta
        .iter()
        .map(|&d| if d > 0.0 { d } else { 0.0 })
        .collect();
    let loss: Vec<f64> = delta
        .iter()
        .map(|&d| if d < 0.0 { -d } else { 0.0 })
        .collect();

    let alpha = com_alpha(period.saturating_sub(1) as f64);
    let avg_gain = ewm(&gain, alpha);
    let avg_loss = ewm(&loss, alpha);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| 100.0 - 100.0 / (1.0 + g / l))
        .collect()
}

/// RSI with Wilder smoothing seeded by the mean of the first `period` changes.
/// First value at index `period`.
pub fn rsi_wilder(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return out;
    }

    let delta = diff(close);
    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for d in &delta[1..=period] {
        if *d > 0.0 {
            avg_gain += d;
        } else {
            avg_loss -= d;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    let ratio = |g: f64, l: f64| if g + l == 0.0 { 0.0 } else { 100.0 * g / (g + l) };
    out[period] = ratio(avg_gain, avg_loss);

    let p = period as f64;
    for i in period + 1..n {
        let d = delta[i];
        let (g, l) = if d > 0.0 { (d, 0.0) } else { (0.0, -d) };
        avg_gain = (avg_gain * (p - 1.0) + g) / p;
        avg_loss = (avg_loss * (p - 1.0) + l) / p;
        out[i] = ratio(avg_gain, avg_loss);
    }
    out
}

#[derive(Debug, Clone)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

pub fn macd_recursive(close: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let fast_ema = ewm(close, span_alpha(fast));
    let slow_ema = ewm(close, span_alpha(slow));
    let macd: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ewm(&macd, span_alpha(signal));
    MacdOutput { macd, signal }
}

/// Seeded variant. Both averages start together at the slow average's first index,
/// each seeded with the mean of its own window ending there, and the MACD line is
/// masked until its signal line exists.
pub fn macd_seeded(close: &[f64], fast: usize, slow: usize, signal: usize) -> MacdOutput {
    let n = close.len();
    let Some(first) = close.iter().position(|v| !v.is_nan()) else {
        return MacdOutput {
            macd: vec![f64::NAN; n],
            signal: vec![f64::NAN; n],
        };
    };

    let start = first + slow.max(fast).max(1) - 1;
    let fast_ema = ema_seeded_at(close, fast, start);
    let slow_ema = ema_seeded_at(close, slow, start);
    let mut macd: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ema_seeded(&macd, signal);

    let first_signal = signal.iter().position(|v| !v.is_nan()).unwrap_or(n);
    for value in macd.iter_mut().take(first_signal) {
        *value = f64::NAN;
    }
    MacdOutput { macd, signal }
}

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(data: &[f64], period: usize, multiplier: f64, ddof: usize) -> BollingerBands {
    let middle = rolling_mean(data, period);
    let std = rolling_std(data, period, ddof);
    let upper = middle.iter().zip(&std).map(|(m, s)| m + s * multiplier).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - s * multiplier).collect();
    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// Running sum of `volume * sign(close change)`. Row 0 has no change and is NaN;
/// the sum itself skips it.
pub fn obv_recursive(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let delta = diff(close);
    let mut out = Vec::with_capacity(close.len());
    let mut total = 0.0;
    for (d, v) in delta.iter().zip(volume) {
        let step = v * sign(*d);
        if step.is_nan() {
            out.push(f64::NAN);
        } else {
            total += step;
            out.push(total);
        }
    }
    out
}

/// Starts at the first volume, then adds or subtracts each volume by close direction.
pub fn obv_seeded(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len().min(volume.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    let mut total = volume[0];
    out.push(total);
    for i in 1..n {
        if close[i] > close[i - 1] {
            total += volume[i];
        } else if close[i] < close[i - 1] {
            total -= volume[i];
        }
        out.push(total);
    }
    out
}
