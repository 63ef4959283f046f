//! Support Vector Classifier
//!
//! SMO (Sequential Minimal Optimization) over kernel rows computed on
//! demand. Each solver keeps recently used rows in a bounded LRU cache, so
//! memory stays at `cache_size` megabytes per machine whatever the number
//! of training rows. More than two classes are handled one-vs-rest; all
//! binary machines share the same pool of support vectors.

use super::models::{
    check_fit_input, expect_float, expect_int, expect_optional_int, sorted_classes,
    unknown_parameter, Estimator,
};
use crate::error::{Result, SelectionError};
use crate::optimizer::{Configuration, ParameterValue};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rows per block when evaluating the decision function
const PREDICT_BLOCK_ROWS: usize = 1024;

/// Consecutive passes without an update before SMO stops
const MAX_QUIET_PASSES: usize = 5;

/// Kernel family as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelKind {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

/// Kernel coefficient policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * Var(X))`
    Scale,
    /// `1 / n_features`
    Auto,
    Value(f64),
}

/// Kernel function with all coefficients resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF { gamma: f64 },
    /// Sigmoid kernel: K(x, y) = tanh(γ * x · y + r)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelType {
    /// Compute kernel between two vectors
    pub fn evaluate(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            KernelType::Linear => a.dot(&b),
            KernelType::Polynomial { degree, gamma, coef0 } => {
                (gamma * a.dot(&b) + coef0).powi(*degree as i32)
            }
            KernelType::RBF { gamma } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * norm_sq).exp()
            }
            KernelType::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }

    /// Kernel values between every row of `a` and every row of `b`
    pub fn matrix(&self, a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut k = Array2::zeros((a.nrows(), b.nrows()));
        Zip::from(k.rows_mut())
            .and(a.rows())
            .par_for_each(|mut k_row, a_row| {
                for (value, b_row) in k_row.iter_mut().zip(b.rows()) {
                    *value = self.evaluate(a_row, b_row);
                }
            });
        k
    }
}

/// Kernel rows of the training matrix, computed when first needed and
/// evicted least-recently-used once `capacity` rows are held
struct KernelCache<'a> {
    x: &'a Array2<f64>,
    kernel: &'a KernelType,
    diag: Array1<f64>,
    capacity: usize,
    rows: Vec<Array1<f64>>,
    owners: Vec<usize>,
    last_used: Vec<u64>,
    slots: HashMap<usize, usize>,
    clock: u64,
}

impl<'a> KernelCache<'a> {
    fn new(x: &'a Array2<f64>, kernel: &'a KernelType, cache_bytes: usize) -> Self {
        let n = x.nrows();
        let row_bytes = n.max(1) * std::mem::size_of::<f64>();
        // Two rows are live during every update
        let capacity = (cache_bytes / row_bytes).clamp(2, n.max(2));
        let diag = x.rows().into_iter().map(|r| kernel.evaluate(r, r)).collect();

        Self {
            x,
            kernel,
            diag,
            capacity,
            rows: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
            last_used: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
            clock: 0,
        }
    }

    fn diag(&self, i: usize) -> f64 {
        self.diag[i]
    }

    /// `K(x_i, x_j)`, read from a cached row when there is one
    fn value(&self, i: usize, j: usize) -> f64 {
        match (self.slots.get(&i), self.slots.get(&j)) {
            (Some(&s), _) => self.rows[s][j],
            (None, Some(&s)) => self.rows[s][i],
            (None, None) => self.kernel.evaluate(self.x.row(i), self.x.row(j)),
        }
    }

    /// Slot holding row `i`; never evicts `pinned`
    fn slot(&mut self, i: usize, pinned: Option<usize>) -> usize {
        self.clock += 1;
        if let Some(&s) = self.slots.get(&i) {
            self.last_used[s] = self.clock;
            return s;
        }

        let (x, kernel) = (self.x, self.kernel);
        let row: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| kernel.evaluate(x.row(i), r))
            .collect();

        let s = if self.rows.len() < self.capacity {
            self.rows.push(row);
            self.owners.push(i);
            self.last_used.push(self.clock);
            self.rows.len() - 1
        } else {
            let s = (0..self.rows.len())
                .filter(|&s| Some(s) != pinned)
                .min_by_key(|&s| self.last_used[s])
                .unwrap_or(0);
            self.slots.remove(&self.owners[s]);
            self.rows[s] = row;
            self.owners[s] = i;
            self.last_used[s] = self.clock;
            s
        };
        self.slots.insert(i, s);
        s
    }

    /// Full kernel rows for `i` and `j`
    fn rows(&mut self, i: usize, j: usize) -> (ArrayView1<'_, f64>, ArrayView1<'_, f64>) {
        let si = self.slot(i, None);
        let sj = self.slot(j, Some(si));
        (self.rows[si].view(), self.rows[sj].view())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// A single binary machine over the shared support pool
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryMachine {
    /// `alpha_i * y_i` for every row of the support pool
    coef: Array1<f64>,
    bias: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedSvm {
    kernel: KernelType,
    support_vectors: Array2<f64>,
    machines: Vec<BinaryMachine>,
    classes: Vec<i64>,
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    /// Regularization parameter
    pub c: f64,
    pub kernel: KernelKind,
    pub gamma: Gamma,
    /// Polynomial degree
    pub degree: u32,
    /// Independent term for poly and sigmoid kernels
    pub coef0: f64,
    /// Tolerance for the KKT check
    pub tol: f64,
    /// Cap on SMO passes over the data (None = run to convergence)
    pub max_iter: Option<usize>,
    /// Kernel row cache per binary machine, in megabytes
    pub cache_size: f64,
    pub random_state: u64,
    fitted: Option<FittedSvm>,
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SvmClassifier {
    /// RBF classifier with `C = 1` and `gamma = scale`
    pub fn new() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::Rbf,
            gamma: Gamma::Scale,
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: None,
            cache_size: 64.0,
            random_state: 42,
            fitted: None,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_max_iter(mut self, max_iter: Option<usize>) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_cache_size(mut self, megabytes: f64) -> Self {
        self.cache_size = megabytes;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn check_params(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(SelectionError::invalid_parameter("C", self.c, "must be positive"));
        }
        if !(self.tol > 0.0) {
            return Err(SelectionError::invalid_parameter("tol", self.tol, "must be positive"));
        }
        if self.max_iter == Some(0) {
            return Err(SelectionError::invalid_parameter(
                "max_iter",
                0,
                "must be positive or 'unlimited'",
            ));
        }
        if let Gamma::Value(g) = self.gamma {
            if !(g > 0.0) {
                return Err(SelectionError::invalid_parameter("gamma", g, "must be positive"));
            }
        }
        if !(self.cache_size > 0.0 && self.cache_size.is_finite()) {
            return Err(SelectionError::invalid_parameter(
                "cache_size",
                self.cache_size,
                "must be a positive number of megabytes",
            ));
        }
        Ok(())
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self.gamma {
            Gamma::Value(g) => g,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }

    fn resolve_kernel(&self, x: &Array2<f64>) -> KernelType {
        let gamma = self.resolve_gamma(x);
        match self.kernel {
            KernelKind::Linear => KernelType::Linear,
            KernelKind::Poly => KernelType::Polynomial {
                degree: self.degree,
                gamma,
                coef0: self.coef0,
            },
            KernelKind::Rbf => KernelType::RBF { gamma },
            KernelKind::Sigmoid => KernelType::Sigmoid {
                gamma,
                coef0: self.coef0,
            },
        }
    }

    fn fit_svm(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.check_params()?;

        let n = x.nrows();
        let classes = sorted_classes(y);
        if classes.len() < 2 {
            return Err(SelectionError::TrainingError(
                "SVC requires at least 2 distinct classes".to_string(),
            ));
        }

        let kernel = self.resolve_kernel(x);
        let cache_bytes = (self.cache_size * 1024.0 * 1024.0) as usize;

        // Binary problems need a single machine for the larger class code
        let positives: &[i64] = if classes.len() == 2 { &classes[1..] } else { &classes };

        let solutions: Vec<(Array1<f64>, f64)> = positives
            .par_iter()
            .enumerate()
            .map(|(k, &cls)| {
                let y_binary = y.mapv(|v| if v.round() as i64 == cls { 1.0 } else { -1.0 });
                let seed = self.random_state.wrapping_add(k as u64);
                let mut cache = KernelCache::new(x, &kernel, cache_bytes);
                let (alphas, bias) = self.smo_train(&mut cache, &y_binary, seed);
                (&alphas * &y_binary, bias)
            })
            .collect();

        // Rows that are a support vector of at least one machine
        let support: Vec<usize> = (0..n)
            .filter(|&i| solutions.iter().any(|(coef, _)| coef[i].abs() > 1e-8))
            .collect();

        let machines = solutions
            .into_iter()
            .map(|(coef, bias)| BinaryMachine {
                coef: support.iter().map(|&i| coef[i]).collect(),
                bias,
            })
            .collect();

        self.fitted = Some(FittedSvm {
            kernel,
            support_vectors: x.select(ndarray::Axis(0), &support),
            machines,
            classes,
        });

        Ok(())
    }

    /// SMO training over cached kernel rows; returns `(alphas, bias)`
    fn smo_train(&self, k: &mut KernelCache<'_>, y: &Array1<f64>, seed: u64) -> (Array1<f64>, f64) {
        let n = y.len();
        let c = self.c;
        let tol = self.tol;

        let mut alphas = Array1::<f64>::zeros(n);
        let mut bias = 0.0;
        // f(x_i) - y_i, kept current after every update
        let mut errors: Array1<f64> = -y;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let mut passes = 0;
        let mut total_iter = 0;

        while passes < MAX_QUIET_PASSES && self.max_iter.map_or(true, |m| total_iter < m) {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = errors[i];

                // Check KKT conditions
                if !((y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0)) {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = errors[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                let (l, h) = if y[i] != y[j] {
                    ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
                } else {
                    ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
                };

                if (l - h).abs() < 1e-10 {
                    continue;
                }

                let (k_ii, k_jj, k_ij) = (k.diag(i), k.diag(j), k.value(i, j));
                let eta = 2.0 * k_ij - k_ii - k_jj;
                if eta >= 0.0 {
                    continue;
                }

                let alpha_j = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (alpha_j - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);

                let d_i = y[i] * (alpha_i - alpha_i_old);
                let d_j = y[j] * (alpha_j - alpha_j_old);

                let b1 = bias - e_i - d_i * k_ii - d_j * k_ij;
                let b2 = bias - e_j - d_i * k_ij - d_j * k_jj;

                let new_bias = if alpha_i > 0.0 && alpha_i < c {
                    b1
                } else if alpha_j > 0.0 && alpha_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                let d_b = new_bias - bias;
                let (row_i, row_j) = k.rows(i, j);
                Zip::from(&mut errors)
                    .and(row_i)
                    .and(row_j)
                    .for_each(|e, &k_i, &k_j| *e += d_i * k_i + d_j * k_j + d_b);

                alphas[i] = alpha_i;
                alphas[j] = alpha_j;
                bias = new_bias;
                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, bias)
    }

    /// Raw decision values, one column per binary machine
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self.fitted.as_ref().ok_or(SelectionError::ModelNotFitted)?;
        if x.ncols() != fitted.support_vectors.ncols() {
            return Err(SelectionError::ShapeError {
                expected: format!("{} columns", fitted.support_vectors.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut scores = Array2::zeros((x.nrows(), fitted.machines.len()));
        for (block, mut out) in x
            .axis_chunks_iter(Axis(0), PREDICT_BLOCK_ROWS)
            .zip(scores.axis_chunks_iter_mut(Axis(0), PREDICT_BLOCK_ROWS))
        {
            let k = fitted.kernel.matrix(block, fitted.support_vectors.view());
            for (m, machine) in fitted.machines.iter().enumerate() {
                out.column_mut(m).assign(&(k.dot(&machine.coef) + machine.bias));
            }
        }
        Ok(scores)
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.fitted
            .as_ref()
            .map_or(0, |f| f.support_vectors.nrows())
    }
}

fn parse_kernel(value: &ParameterValue) -> Result<KernelKind> {
    match value.as_str() {
        Some("linear") => Ok(KernelKind::Linear),
        Some("poly") => Ok(KernelKind::Poly),
        Some("rbf") => Ok(KernelKind::Rbf),
        Some("sigmoid") => Ok(KernelKind::Sigmoid),
        _ => Err(SelectionError::invalid_parameter(
            "kernel",
            value,
            "expected 'linear', 'poly', 'rbf' or 'sigmoid'",
        )),
    }
}

fn parse_gamma(value: &ParameterValue) -> Result<Gamma> {
    match value {
        ParameterValue::String(s) if s == "scale" => Ok(Gamma::Scale),
        ParameterValue::String(s) if s == "auto" => Ok(Gamma::Auto),
        ParameterValue::Float(_) | ParameterValue::Int(_) => {
            Ok(Gamma::Value(expect_float("gamma", value)?))
        }
        _ => Err(SelectionError::invalid_parameter(
            "gamma",
            value,
            "expected 'scale', 'auto' or a number",
        )),
    }
}

impl Estimator for SvmClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fitted = None;
        self.fit_svm(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fitted = self.fitted.as_ref().ok_or(SelectionError::ModelNotFitted)?;
        let scores = self.decision_function(x)?;

        Ok(scores
            .rows()
            .into_iter()
            .map(|row| {
                if fitted.machines.len() == 1 {
                    let idx = if row[0] >= 0.0 { 1 } else { 0 };
                    return fitted.classes[idx] as f64;
                }
                // Highest one-vs-rest score; ties go to the lower class
                let mut best = 0;
                for (m, &score) in row.iter().enumerate() {
                    if score > row[best] {
                        best = m;
                    }
                }
                fitted.classes[best] as f64
            })
            .collect())
    }

    fn clone_with_params(&self, params: &Configuration) -> Result<Box<dyn Estimator>> {
        let mut model = Self {
            fitted: None,
            ..self.clone()
        };

        for (name, value) in params.iter() {
            match name {
                "C" | "c" => model.c = expect_float(name, value)?,
                "kernel" => model.kernel = parse_kernel(value)?,
                "gamma" => model.gamma = parse_gamma(value)?,
                "degree" => model.degree = expect_int(name, value)?.clamp(0, u32::MAX as i64) as u32,
                "coef0" => model.coef0 = expect_float(name, value)?,
                "tol" => model.tol = expect_float(name, value)?,
                "cache_size" => model.cache_size = expect_float(name, value)?,
                "max_iter" => {
                    // Negative values saturate to zero so that fit rejects them
                    model.max_iter = expect_optional_int(name, value)?.map(|m| m.max(0) as usize)
                }
                "random_state" => model.random_state = expect_int(name, value)? as u64,
                _ => return Err(unknown_parameter(self.name(), name, value)),
            }
        }

        Ok(Box::new(model))
    }

    fn name(&self) -> &'static str {
        "svc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_linear_separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (10, 2),
            vec![
                1.0, 1.0, 1.5, 1.2, 2.0, 2.0, 1.2, 1.8, 0.8, 1.5, 5.0, 5.0, 5.5, 5.2, 6.0, 6.0,
                5.2, 5.8, 4.8, 5.5,
            ],
        )
        .unwrap();

        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

        (x, y)
    }

    fn accuracy(y: &Array1<f64>, predictions: &Array1<f64>) -> f64 {
        let correct = y
            .iter()
            .zip(predictions.iter())
            .filter(|(&yi, &pi)| yi == pi)
            .count();
        correct as f64 / y.len() as f64
    }

    #[test]
    fn test_svm_classifier_linear() {
        let (x, y) = create_linear_separable_data();

        let mut svm = SvmClassifier::new()
            .with_kernel(KernelKind::Linear)
            .with_max_iter(Some(1000));
        svm.fit(&x, &y).unwrap();

        let predictions = svm.predict(&x).unwrap();
        let acc = accuracy(&y, &predictions);
        assert!(acc > 0.8, "Accuracy {} should be > 0.8", acc);
        assert!(svm.n_support_vectors() > 0);
    }

    #[test]
    fn test_svm_classifier_rbf() {
        let (x, y) = create_linear_separable_data();

        let mut svm = SvmClassifier::new().with_gamma(Gamma::Value(0.5));
        svm.fit(&x, &y).unwrap();

        let predictions = svm.predict(&x).unwrap();
        assert_eq!(predictions.len(), 10);
        assert!(accuracy(&y, &predictions) > 0.8);
    }

    #[test]
    fn test_svm_classifier_multiclass() {
        let x = Array2::from_shape_vec(
            (15, 2),
            vec![
                1.0, 1.0, 1.5, 1.2, 2.0, 2.0, 1.2, 1.8, 0.8, 1.5, //
                5.0, 5.0, 5.5, 5.2, 6.0, 6.0, 5.2, 5.8, 4.8, 5.5, //
                1.0, 5.0, 1.5, 5.2, 2.0, 6.0, 1.2, 5.8, 0.8, 5.5,
            ],
        )
        .unwrap();

        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0,
        ]);

        let mut svm = SvmClassifier::new()
            .with_c(10.0)
            .with_gamma(Gamma::Value(0.5))
            .with_max_iter(Some(1000));
        svm.fit(&x, &y).unwrap();

        let predictions = svm.predict(&x).unwrap();
        assert_eq!(predictions.len(), 15);

        for &p in predictions.iter() {
            assert!(p == 0.0 || p == 1.0 || p == 2.0, "Unexpected class: {}", p);
        }

        let acc = accuracy(&y, &predictions);
        assert!(acc > 0.6, "Multi-class accuracy {} should be > 0.6", acc);
    }

    #[test]
    fn test_gamma_scale() {
        let x = Array2::from_shape_vec((2, 2), vec![0.0, 0.0, 2.0, 2.0]).unwrap();
        let svm = SvmClassifier::new();
        // Var over all elements = 1, two features
        assert!((svm.resolve_gamma(&x) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_max_iter_fails_at_fit() {
        let (x, y) = create_linear_separable_data();
        let params = Configuration::from_pairs(vec![("max_iter", 0i64)]);
        let mut model = SvmClassifier::new().clone_with_params(&params).unwrap();

        assert!(matches!(
            model.fit(&x, &y),
            Err(SelectionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_non_positive_c_fails_at_fit() {
        let (x, y) = create_linear_separable_data();
        let mut svm = SvmClassifier::new().with_c(0.0);
        assert!(svm.fit(&x, &y).is_err());
    }

    #[test]
    fn test_single_class_fails() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, 1.0, 1.0]);
        let mut svm = SvmClassifier::new();
        assert!(matches!(svm.fit(&x, &y), Err(SelectionError::TrainingError(_))));
    }

    #[test]
    fn test_clone_with_params() {
        let params = Configuration::from_pairs(vec![
            ("C", ParameterValue::Int(5)),
            ("kernel", ParameterValue::from("rbf")),
            ("gamma", ParameterValue::from("scale")),
            ("max_iter", ParameterValue::Unlimited),
        ]);
        let mut model = SvmClassifier::new().clone_with_params(&params).unwrap();

        let (x, y) = create_linear_separable_data();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap().len(), 10);
    }

    #[test]
    fn test_bad_kernel_is_config_error() {
        let params = Configuration::from_pairs(vec![("kernel", "cubic")]);
        assert!(SvmClassifier::new().clone_with_params(&params).is_err());

        let params = Configuration::from_pairs(vec![("gamma", true)]);
        assert!(SvmClassifier::new().clone_with_params(&params).is_err());
    }

    #[test]
    fn test_kernel_cache_matches_direct_evaluation() {
        let x = Array2::from_shape_fn((6, 2), |(i, j)| (i * 3 + j) as f64 / 5.0);
        let kernel = KernelType::RBF { gamma: 0.7 };
        // Budget below two rows still keeps two
        let mut cache = KernelCache::new(&x, &kernel, 1);

        for &(i, j) in &[(0, 1), (2, 3), (0, 4), (5, 1), (0, 1), (3, 3)] {
            let (row_i, row_j) = cache.rows(i, j);
            for r in 0..6 {
                assert!((row_i[r] - kernel.evaluate(x.row(i), x.row(r))).abs() < 1e-12);
                assert!((row_j[r] - kernel.evaluate(x.row(j), x.row(r))).abs() < 1e-12);
            }
            assert!((cache.value(i, j) - kernel.evaluate(x.row(i), x.row(j))).abs() < 1e-12);
            assert!(cache.len() <= 2);
        }
        assert!((cache.diag(4) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_many_rows_with_small_cache() {
        let n = 15_000;
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let center = if y[i] == 1.0 { 2.0 } else { -2.0 };
            center + ((i * 7 + j * 13) % 100) as f64 / 100.0
        });

        let mut svm = SvmClassifier::new()
            .with_kernel(KernelKind::Linear)
            .with_max_iter(Some(1))
            .with_cache_size(1.0);
        svm.fit(&x, &y).unwrap();

        let predictions = svm.predict(&x).unwrap();
        assert_eq!(predictions.len(), n);
        assert!(svm.n_support_vectors() > 0);
        assert!(accuracy(&y, &predictions) > 0.9);
    }

    #[test]
    fn test_non_positive_cache_size_fails_at_fit() {
        let (x, y) = create_linear_separable_data();
        let mut svm = SvmClassifier::new().with_cache_size(0.0);
        assert!(matches!(
            svm.fit(&x, &y),
            Err(SelectionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_predict_unfitted() {
        let (x, _) = create_linear_separable_data();
        assert!(matches!(
            SvmClassifier::new().predict(&x),
            Err(SelectionError::ModelNotFitted)
        ));
    }
}
