use crate::error::HandlerResult;
use crate::{Request, Response};

/// The terminal step of a route: it must finalize the response or fail.
pub trait RequestHandler: Send + Sync {
    fn invoke(&self, req: &mut Request, resp: &mut Response) -> HandlerResult;
}

/// a `Fn` holder which represents a closure or function handler
#[derive(Clone, Copy, Debug)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult,
{
    fn new(f: F) -> Self {
        Self { f }
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync,
{
    FnHandler::new(f)
}

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync,
{
    fn invoke(&self, req: &mut Request, resp: &mut Response) -> HandlerResult {
        (self.f)(req, resp)
    }
}

impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    fn invoke(&self, req: &mut Request, resp: &mut Response) -> HandlerResult {
        (**self).invoke(req, resp)
    }
}

#[cfg(test)]
mod test {
    use crate::handler::{handler_fn, FnHandler, RequestHandler};
    use crate::{HandlerResult, Request, Response};

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn hello(_req: &mut Request, resp: &mut Response) -> HandlerResult {
        resp.send("hello")
    }

    #[test]
    fn assert_fn_is_handler() {
        let handler: FnHandler<_> = handler_fn(hello);
        assert_is_handler(&handler);
    }

    #[test]
    fn assert_closure_is_handler() {
        let greeting = String::from("hi");
        let handler = handler_fn(move |_req, resp| resp.send(greeting.clone()));
        assert_is_handler(&handler);

        let boxed: Box<dyn RequestHandler> = Box::new(handler);
        assert_is_handler(&boxed);
    }
}
