//! Derivative-free minimizers
//!
//! Two minimizers cover every iterative fit in the workspace:
//!
//! - [`minimize_bounded`]: Brent's method on a closed interval (golden-section
//!   steps with parabolic interpolation), used to refine the p-curve estimate.
//! - [`minimize_box`]: Nelder–Mead simplex search with box constraints, used for
//!   the selection-model likelihood. Coordinates whose bounds coincide are held
//!   fixed and never enter the simplex.
//!
//! Both are pure functions of the objective and their options. Running out of
//! iterations or wall-clock time is reported as [`MinimizeStatus::BudgetExhausted`]
//! together with the best point seen; callers decide whether that is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Iteration and wall-clock limits for an optimizer run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub max_iterations: usize,
    pub max_duration: Option<Duration>,
}

impl Budget {
    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            max_duration: None,
        }
    }

    pub fn with_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    fn clock(&self) -> BudgetClock {
        BudgetClock {
            budget: *self,
            started: Instant::now(),
        }
    }
}

struct BudgetClock {
    budget: Budget,
    started: Instant,
}

impl BudgetClock {
    fn exhausted(&self, iterations: usize) -> bool {
        iterations >= self.budget.max_iterations
            || self
                .budget
                .max_duration
                .is_some_and(|limit| self.started.elapsed() >= limit)
    }
}

/// How an optimizer run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MinimizeStatus {
    Converged,
    BudgetExhausted,
}

/// Result of a scalar minimization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarMinimum {
    pub x: f64,
    pub value: f64,
    /// Objective evaluations used
    pub iterations: usize,
    pub status: MinimizeStatus,
}

impl ScalarMinimum {
    pub fn converged(&self) -> bool {
        self.status == MinimizeStatus::Converged
    }
}

/// Options for [`minimize_bounded`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarOptions {
    /// Absolute tolerance on the minimizer
    pub x_tolerance: f64,
    pub budget: Budget,
}

impl Default for ScalarOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 1e-5,
            budget: Budget::iterations(500),
        }
    }
}

/// Non-finite objective values are treated as +∞ so they never win a comparison
fn finite_or_inf(value: f64) -> f64 {
    if value.is_nan() {
        f64::INFINITY
    } else {
        value
    }
}

/// `sign(x)` with `sign(0) = 1`
fn step_sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Minimize `f` over `[lower, upper]` with Brent's bounded method
pub fn minimize_bounded<F>(
    f: F,
    lower: f64,
    upper: f64,
    options: &ScalarOptions,
) -> Result<ScalarMinimum>
where
    F: Fn(f64) -> f64,
{
    if !(lower.is_finite() && upper.is_finite()) || lower > upper {
        return Err(Error::InvalidParameter(format!(
            "bounded minimization needs a finite interval, got [{lower}, {upper}]"
        )));
    }
    if options.x_tolerance <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "x tolerance must be positive, got {}",
            options.x_tolerance
        )));
    }

    let clock = options.budget.clock();
    let sqrt_eps = f64::EPSILON.sqrt();
    let golden_mean = 0.5 * (3.0 - 5f64.sqrt());

    let (mut a, mut b) = (lower, upper);
    let mut fulc = a + golden_mean * (b - a);
    let mut nfc = fulc;
    let mut xf = fulc;
    let mut rat = 0.0;
    let mut e: f64 = 0.0;
    let mut fx = finite_or_inf(f(xf));
    let mut evaluations = 1;
    let mut ffulc = fx;
    let mut fnfc = fx;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + options.x_tolerance / 3.0;
    let mut tol2 = 2.0 * tol1;

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        if clock.exhausted(evaluations) {
            debug!(evaluations, x = xf, "bounded minimization ran out of budget");
            return Ok(ScalarMinimum {
                x: xf,
                value: fx,
                iterations: evaluations,
                status: MinimizeStatus::BudgetExhausted,
            });
        }

        let mut golden = true;
        if e.abs() > tol1 {
            golden = false;
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * step_sign(xm - xf);
                }
            } else {
                golden = true;
            }
        }

        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = golden_mean * e;
        }

        let x = xf + step_sign(rat) * rat.abs().max(tol1);
        let fu = finite_or_inf(f(x));
        evaluations += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + options.x_tolerance / 3.0;
        tol2 = 2.0 * tol1;
    }

    Ok(ScalarMinimum {
        x: xf,
        value: fx,
        iterations: evaluations,
        status: MinimizeStatus::Converged,
    })
}

/// Closed interval for one coordinate; either side may be infinite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Option<f64>; 2]", into = "[Option<f64>; 2]")]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Degenerate interval pinning a coordinate to `value`
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.max(self.lower).min(self.upper)
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.lower.is_nan() || self.upper.is_nan() || self.lower > self.upper {
            return Err(Error::InvalidParameter(format!(
                "bounds for {name} are inverted or NaN: [{}, {}]",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// `null` on either side means unbounded in that direction
impl From<[Option<f64>; 2]> for Bounds {
    fn from([lower, upper]: [Option<f64>; 2]) -> Self {
        Self::new(
            lower.unwrap_or(f64::NEG_INFINITY),
            upper.unwrap_or(f64::INFINITY),
        )
    }
}

impl From<Bounds> for [Option<f64>; 2] {
    fn from(bounds: Bounds) -> Self {
        let finite = |x: f64| x.is_finite().then_some(x);
        [finite(bounds.lower), finite(bounds.upper)]
    }
}

/// Options for [`minimize_box`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxOptions {
    /// Largest allowed spread of simplex vertices around the best one
    pub x_tolerance: f64,
    /// Largest allowed spread of objective values across the simplex
    pub f_tolerance: f64,
    pub budget: Budget,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 1e-8,
            f_tolerance: 1e-8,
            budget: Budget::iterations(2000),
        }
    }
}

/// Result of a box-constrained minimization
#[derive(Debug, Clone, PartialEq)]
pub struct BoxMinimum {
    /// Full parameter vector, fixed coordinates included
    pub x: Vec<f64>,
    pub value: f64,
    /// Simplex iterations used
    pub iterations: usize,
    pub status: MinimizeStatus,
}

impl BoxMinimum {
    pub fn converged(&self) -> bool {
        self.status == MinimizeStatus::Converged
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `f` inside the box `bounds` with a projected Nelder–Mead search
///
/// Trial points are clipped to the box. `start` must lie inside it.
pub fn minimize_box<F>(
    f: F,
    start: &[f64],
    bounds: &[Bounds],
    options: &BoxOptions,
) -> Result<BoxMinimum>
where
    F: Fn(&[f64]) -> f64,
{
    if start.len() != bounds.len() {
        return Err(Error::InvalidInput(format!(
            "start has {} coordinates but {} bounds were given",
            start.len(),
            bounds.len()
        )));
    }
    for (i, (b, &x)) in bounds.iter().zip(start).enumerate() {
        b.validate(&format!("coordinate {i}"))?;
        if !b.contains(x) {
            return Err(Error::InvalidParameter(format!(
                "start value {x} for coordinate {i} lies outside [{}, {}]",
                b.lower, b.upper
            )));
        }
    }

    let free: Vec<usize> = (0..start.len()).filter(|&i| !bounds[i].is_fixed()).collect();
    let expand_point = |reduced: &[f64]| -> Vec<f64> {
        let mut full = start.to_vec();
        for (&i, &v) in free.iter().zip(reduced) {
            full[i] = v;
        }
        full
    };
    let objective = |reduced: &[f64]| finite_or_inf(f(&expand_point(reduced)));
    let clip = |point: &mut [f64]| {
        for (&i, v) in free.iter().zip(point.iter_mut()) {
            *v = bounds[i].clamp(*v);
        }
    };

    if free.is_empty() {
        let value = finite_or_inf(f(start));
        return Ok(BoxMinimum {
            x: start.to_vec(),
            value,
            iterations: 0,
            status: MinimizeStatus::Converged,
        });
    }

    let n = free.len();
    let x0: Vec<f64> = free.iter().map(|&i| start[i]).collect();

    // Initial simplex: 5% steps, or a small absolute step at zero. A step that
    // would leave the box goes the other way.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for k in 0..n {
        let mut vertex = x0.clone();
        let step = if x0[k] != 0.0 { 0.05 * x0[k] } else { 0.00025 };
        let b = bounds[free[k]];
        vertex[k] = if b.contains(x0[k] + step) {
            x0[k] + step
        } else {
            b.clamp(x0[k] - step)
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();
    sort_simplex(&mut simplex, &mut values);

    let clock = options.budget.clock();
    let mut iterations = 0;
    let status = loop {
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = values[1..]
            .iter()
            .map(|v| (v - values[0]).abs())
            .fold(0.0, f64::max);
        if x_spread <= options.x_tolerance && f_spread <= options.f_tolerance {
            break MinimizeStatus::Converged;
        }
        if clock.exhausted(iterations) {
            break MinimizeStatus::BudgetExhausted;
        }

        let worst = simplex[n].clone();
        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let along = |coef: f64| -> Vec<f64> {
            let mut p: Vec<f64> = centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| (1.0 + coef) * c - coef * w)
                .collect();
            clip(&mut p);
            p
        };

        let reflected = along(REFLECT);
        let f_reflected = objective(&reflected);
        let mut shrink = false;

        if f_reflected < values[0] {
            let expanded = along(REFLECT * EXPAND);
            let f_expanded = objective(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
        } else if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
        } else if f_reflected < values[n] {
            let outside = along(CONTRACT * REFLECT);
            let f_outside = objective(&outside);
            if f_outside <= f_reflected {
                simplex[n] = outside;
                values[n] = f_outside;
            } else {
                shrink = true;
            }
        } else {
            let inside = along(-CONTRACT);
            let f_inside = objective(&inside);
            if f_inside < values[n] {
                simplex[n] = inside;
                values[n] = f_inside;
            } else {
                shrink = true;
            }
        }

        if shrink {
            let best = simplex[0].clone();
            for j in 1..=n {
                let mut p: Vec<f64> = best
                    .iter()
                    .zip(&simplex[j])
                    .map(|(b, v)| b + SHRINK * (v - b))
                    .collect();
                clip(&mut p);
                values[j] = objective(&p);
                simplex[j] = p;
            }
        }

        iterations += 1;
        sort_simplex(&mut simplex, &mut values);
    };

    debug!(iterations, value = values[0], ?status, "simplex search finished");

    Ok(BoxMinimum {
        x: expand_point(&simplex[0]),
        value: values[0],
        iterations,
        status,
    })
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounded_quadratic() {
        let min =
            minimize_bounded(|x| (x - 0.3).powi(2), 0.0, 1.0, &ScalarOptions::default()).unwrap();
        assert!(min.converged());
        assert_relative_eq!(min.x, 0.3, epsilon = 1e-5);
    }

    #[test]
    fn test_bounded_minimum_on_edge() {
        let min = minimize_bounded(|x| x, 2.0, 3.0, &ScalarOptions::default()).unwrap();
        assert!(min.converged());
        assert!(min.x >= 2.0 && min.x < 2.0 + 1e-4);
    }

    #[test]
    fn test_bounded_kinked_objective() {
        let options = ScalarOptions::default();
        let min = minimize_bounded(|x: f64| (x - 0.42).abs(), 0.3, 0.5, &options).unwrap();
        assert!(min.converged());
        assert_relative_eq!(min.x, 0.42, epsilon = 1e-4);
    }

    #[test]
    fn test_bounded_budget_exhausted() {
        let options = ScalarOptions {
            x_tolerance: 1e-12,
            budget: Budget::iterations(3),
        };
        let min = minimize_bounded(|x| (x - 0.3).powi(2), 0.0, 1.0, &options).unwrap();
        assert_eq!(min.status, MinimizeStatus::BudgetExhausted);
        assert!(min.x >= 0.0 && min.x <= 1.0);
    }

    #[test]
    fn test_bounded_wall_clock_exhausted() {
        let options = ScalarOptions {
            x_tolerance: 1e-5,
            budget: Budget::iterations(usize::MAX).with_duration(Duration::ZERO),
        };
        let min = minimize_bounded(|x| (x - 0.3).powi(2), 0.0, 1.0, &options).unwrap();
        assert_eq!(min.status, MinimizeStatus::BudgetExhausted);
        assert_eq!(min.iterations, 1);
    }

    #[test]
    fn test_bounded_rejects_bad_interval() {
        let options = ScalarOptions::default();
        assert!(minimize_bounded(|x| x, 1.0, 0.0, &options).is_err());
        assert!(minimize_bounded(|x| x, 0.0, f64::INFINITY, &options).is_err());
    }

    #[test]
    fn test_box_rosenbrock() {
        let rosen = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let bounds = [Bounds::unbounded(), Bounds::unbounded()];
        let options = BoxOptions {
            budget: Budget::iterations(5000),
            ..Default::default()
        };
        let min = minimize_box(rosen, &[-1.2, 1.0], &bounds, &options).unwrap();
        assert!(min.converged());
        assert_relative_eq!(min.x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(min.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_box_active_bound() {
        // Unconstrained minimum at (-1, 2); box keeps x0 >= 0
        let f = |x: &[f64]| (x[0] + 1.0).powi(2) + (x[1] - 2.0).powi(2);
        let bounds = [Bounds::new(0.0, 1.0), Bounds::unbounded()];
        let min = minimize_box(f, &[0.5, 0.0], &bounds, &BoxOptions::default()).unwrap();
        assert!(min.converged());
        assert_relative_eq!(min.x[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(min.x[1], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_box_fixed_coordinate_untouched() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] - 5.0).powi(2);
        let bounds = [Bounds::unbounded(), Bounds::fixed(0.0)];
        let min = minimize_box(f, &[1.0, 0.0], &bounds, &BoxOptions::default()).unwrap();
        assert!(min.converged());
        assert_eq!(min.x[1], 0.0);
        assert_relative_eq!(min.x[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_box_all_fixed() {
        let bounds = [Bounds::fixed(1.0), Bounds::fixed(2.0)];
        let options = BoxOptions::default();
        let min = minimize_box(|x| x[0] + x[1], &[1.0, 2.0], &bounds, &options).unwrap();
        assert!(min.converged());
        assert_eq!(min.iterations, 0);
        assert_relative_eq!(min.value, 3.0);
    }

    #[test]
    fn test_box_start_outside_bounds() {
        let bounds = [Bounds::new(0.0, 1.0)];
        let err = minimize_box(|x| x[0], &[2.0], &bounds, &BoxOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_box_budget_exhausted() {
        let rosen = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let bounds = [Bounds::unbounded(), Bounds::unbounded()];
        let options = BoxOptions {
            budget: Budget::iterations(5),
            ..Default::default()
        };
        let min = minimize_box(rosen, &[-1.2, 1.0], &bounds, &options).unwrap();
        assert_eq!(min.status, MinimizeStatus::BudgetExhausted);
        assert_eq!(min.iterations, 5);
    }

    #[test]
    fn test_box_wall_clock_exhausted() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] - 5.0).powi(2);
        let bounds = [Bounds::unbounded(), Bounds::unbounded()];
        let options = BoxOptions {
            budget: Budget::iterations(usize::MAX).with_duration(Duration::ZERO),
            ..Default::default()
        };
        let min = minimize_box(f, &[1.0, 1.0], &bounds, &options).unwrap();
        assert_eq!(min.status, MinimizeStatus::BudgetExhausted);
        assert_eq!(min.iterations, 0);
        assert_eq!(min.x.len(), 2);
    }

    #[test]
    fn test_bounds_from_optional_pair() {
        let bounds = Bounds::from([None, Some(0.0)]);
        assert_eq!(bounds.lower, f64::NEG_INFINITY);
        assert_eq!(bounds.upper, 0.0);
        assert!(!bounds.is_fixed());
        assert!(Bounds::from([Some(0.0), Some(0.0)]).is_fixed());

        let back: [Option<f64>; 2] = Bounds::unbounded().into();
        assert_eq!(back, [None, None]);
    }
}
