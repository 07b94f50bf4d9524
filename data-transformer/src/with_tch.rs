use crate::{batch::BatchOutput, common::*, pipeline::TransformOutput};
use tch::Tensor;

fn to_tensor(data: &Array4<f32>) -> Result<Tensor> {
    let (n, c, h, w) = data.dim();
    let data = data.as_standard_layout();
    let slice = data
        .as_slice()
        .ok_or_else(|| Error::InvalidArgument("the batch is not contiguous".into()))?;
    Ok(Tensor::of_slice(slice).view([n as i64, c as i64, h as i64, w as i64]))
}

impl TryFrom<&BatchOutput> for Tensor {
    type Error = Error;

    fn try_from(from: &BatchOutput) -> Result<Self, Self::Error> {
        to_tensor(&from.data)
    }
}

impl TryFrom<&TransformOutput> for Tensor {
    type Error = Error;

    fn try_from(from: &TransformOutput) -> Result<Self, Self::Error> {
        to_tensor(&from.data)
    }
}
