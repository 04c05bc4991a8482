/// Inverse golden ratio, `(√5 − 1) / 2`.
const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Golden-section search for a minimum of `f` on `[lo, hi]`.
///
/// Returns `(argmin, min)`. Non-finite evaluations are treated as `+∞`, so the
/// search walks away from regions where `f` is undefined.
pub fn golden_section<F>(f: F, lo: f64, hi: f64, iterations: usize) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let eval = |t: f64| {
        let v = f(t);
        if v.is_finite() { v } else { f64::INFINITY }
    };

    let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = eval(c);
    let mut fd = eval(d);

    for _ in 0..iterations {
        if fc <= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = eval(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = eval(d);
        }
    }

    if fc <= fd { (c, fc) } else { (d, fd) }
}
