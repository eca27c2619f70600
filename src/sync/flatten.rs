//! Flat parameter traversals.
//!
//! The shared store is a flat f32 region; models are burn modules. These
//! mappers bridge the two by walking a module's parameters in traversal
//! order, which is deterministic for a fixed architecture. Every local model
//! is a clone of the same initial module, so the ordering matches across
//! workers and across pushes/pulls.

use burn::module::{Module, ModuleMapper, Param};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use std::marker::PhantomData;

use super::SyncError;

/// Collects every parameter tensor into one flat f32 buffer.
struct ParamFlattener<B: Backend> {
    out: Vec<f32>,
    _backend: PhantomData<B>,
}

impl<B: Backend> ModuleMapper<B> for ParamFlattener<B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let data = param.val().to_data();
        self.out
            .extend(data.to_vec::<f32>().expect("parameter tensors are f32"));
        param
    }
}

/// Rewrites every parameter from a flat f32 buffer, consuming it in
/// traversal order.
struct ParamLoader<'a, B: Backend> {
    flat: &'a [f32],
    cursor: usize,
    short: bool,
    _backend: PhantomData<B>,
}

impl<'a, B: Backend> ModuleMapper<B> for ParamLoader<'a, B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let current = param.val();
        let shape = current.dims();
        let count: usize = shape.iter().product();

        let start = self.cursor;
        self.cursor += count;
        if self.cursor > self.flat.len() {
            self.short = true;
            return param;
        }

        let device = current.device();
        let chunk = &self.flat[start..start + count];
        let tensor = Tensor::<B, 1>::from_floats(chunk, &device).reshape(shape);
        Param::initialized(param.id.clone(), tensor)
    }
}

/// Reads the gradient of every parameter into one flat buffer.
///
/// Parameters with no gradient in `grads` (unreached by the loss) contribute
/// zeros, so the staged global gradient is always fully defined.
struct GradientCollector<'a, B: AutodiffBackend> {
    grads: &'a B::Gradients,
    out: Vec<f32>,
}

impl<'a, B: AutodiffBackend> ModuleMapper<B> for GradientCollector<'a, B> {
    fn map_float<const D: usize>(&mut self, param: Param<Tensor<B, D>>) -> Param<Tensor<B, D>> {
        let value = param.val();
        let count: usize = value.dims().iter().product();

        match value.grad(self.grads) {
            Some(grad) => {
                let data = grad.to_data();
                self.out
                    .extend(data.to_vec::<f32>().expect("gradient tensors are f32"));
            }
            None => self.out.extend(std::iter::repeat(0.0f32).take(count)),
        }
        param
    }
}

/// Flatten a module's parameters in traversal order.
pub fn flatten_params<B: Backend, M: Module<B>>(model: &M) -> Vec<f32> {
    let mut flattener = ParamFlattener {
        out: Vec::new(),
        _backend: PhantomData,
    };
    let _ = model.clone().map(&mut flattener);
    flattener.out
}

/// Overwrite a module's parameters from a flat buffer.
///
/// Fails when the buffer length does not match the module's parameter count.
pub fn load_params<B: Backend, M: Module<B>>(model: M, flat: &[f32]) -> Result<M, SyncError> {
    let mut loader = ParamLoader {
        flat,
        cursor: 0,
        short: false,
        _backend: PhantomData,
    };
    let model = model.map(&mut loader);
    if loader.short || loader.cursor != flat.len() {
        return Err(SyncError::SizeMismatch {
            expected: loader.cursor,
            actual: flat.len(),
        });
    }
    Ok(model)
}

/// Flatten the gradients of a backward pass, in parameter traversal order.
pub fn collect_gradients<B: AutodiffBackend, M: Module<B>>(
    model: &M,
    grads: &B::Gradients,
) -> Vec<f32> {
    let mut collector = GradientCollector::<B> {
        grads,
        out: Vec::new(),
    };
    let _ = model.clone().map(&mut collector);
    collector.out
}
